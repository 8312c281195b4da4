use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ledger::{CoveragePolicy, PassLedger};
use super::matcher::{default_matcher, ContentMatcher};
use super::models::{
    AllocationPhase, DefaultAssignment, DefaultContentKind, DistributionPlan, GameAssignment,
    OutputAssignment, PlanSummary, UnplacedCandidate,
};
use super::{DistributionError, DistributionResult};
use crate::config::MatchdayConfig;
use crate::games::{ChannelRef, GameCandidate, PriorityOracle, PriorityScore};
use crate::venue::{
    ChannelCategory, DeviceType, Input, Output, StateProvider, SystemState, ZoneType,
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub home_team_share: f64,
    pub high_priority_threshold: f64,
    pub primary_zone_types: Vec<ZoneType>,
    pub device_preference: Vec<DeviceType>,
    pub sports_news_input: Option<u32>,
    pub ambient_input: Option<u32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&MatchdayConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &MatchdayConfig) -> Self {
        Self {
            home_team_share: config.distribution.home_team_share,
            high_priority_threshold: config.distribution.high_priority_threshold,
            primary_zone_types: config.distribution.primary_zone_types.clone(),
            device_preference: config.distribution.device_preference.clone(),
            sports_news_input: config.defaults.sports_news_input,
            ambient_input: config.defaults.ambient_input,
        }
    }

    fn device_rank(&self, device: DeviceType) -> usize {
        self.device_preference
            .iter()
            .position(|preferred| *preferred == device)
            .unwrap_or(self.device_preference.len())
    }

    /// Default-content inputs never carry games.
    fn is_reserved(&self, input: u32) -> bool {
        self.sports_news_input == Some(input) || self.ambient_input == Some(input)
    }
}

/// Restricts a planning run to a subset of the estate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub outputs: Option<Vec<u32>>,
    pub inputs: Option<Vec<u32>>,
}

impl PlanOptions {
    fn allows_output(&self, output: u32) -> bool {
        self.outputs
            .as_ref()
            .map(|allowed| allowed.contains(&output))
            .unwrap_or(true)
    }

    fn allows_input(&self, input: u32) -> bool {
        self.inputs
            .as_ref()
            .map(|allowed| allowed.contains(&input))
            .unwrap_or(true)
    }
}

/// Known-valid channel ids per preset family. An empty family means the
/// provider has no preset data for it and nothing is filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPresets {
    pub cable: BTreeSet<String>,
    pub satellite: BTreeSet<String>,
}

impl ChannelPresets {
    pub fn allows(&self, channel: &ChannelRef) -> bool {
        match channel {
            ChannelRef::Cable { channel } => self.cable.is_empty() || self.cable.contains(channel),
            ChannelRef::Satellite { channel } => {
                self.satellite.is_empty() || self.satellite.contains(channel)
            }
            ChannelRef::Streaming { .. } => true,
        }
    }
}

pub struct DistributionEngine {
    state: Arc<dyn StateProvider>,
    oracle: Arc<dyn PriorityOracle>,
    matcher: Arc<dyn ContentMatcher>,
    settings: EngineSettings,
}

impl std::fmt::Debug for DistributionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionEngine")
            .field("matcher", &self.matcher)
            .field("settings", &self.settings)
            .finish()
    }
}

impl DistributionEngine {
    pub fn new(
        state: Arc<dyn StateProvider>,
        oracle: Arc<dyn PriorityOracle>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            state,
            oracle,
            matcher: default_matcher(),
            settings,
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn ContentMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Runs one planning pass. State and oracle failures abort the pass.
    pub async fn create_plan(
        &self,
        candidates: &[GameCandidate],
        options: &PlanOptions,
    ) -> DistributionResult<DistributionPlan> {
        let (state, cable, satellite, scores) = tokio::try_join!(
            async { self.state.snapshot().await.map_err(DistributionError::from) },
            async {
                self.state
                    .valid_channels(ChannelCategory::Cable)
                    .await
                    .map_err(DistributionError::from)
            },
            async {
                self.state
                    .valid_channels(ChannelCategory::Satellite)
                    .await
                    .map_err(DistributionError::from)
            },
            async { self.oracle.score(candidates).await.map_err(DistributionError::from) },
        )?;
        let presets = ChannelPresets { cable, satellite };
        Ok(self.plan_snapshot(&state, &presets, candidates, scores, options))
    }

    /// Allocation over an already fetched snapshot. Pure apart from logging.
    pub fn plan_snapshot(
        &self,
        state: &SystemState,
        presets: &ChannelPresets,
        candidates: &[GameCandidate],
        scores: Vec<PriorityScore>,
        options: &PlanOptions,
    ) -> DistributionPlan {
        PlanningPass::new(
            &self.settings,
            self.matcher.as_ref(),
            state,
            presets,
            options,
            candidates,
            scores,
        )
        .run()
    }
}

#[derive(Debug)]
struct RankedGame<'a> {
    candidate: &'a GameCandidate,
    key: String,
    score: PriorityScore,
    min_tvs: usize,
}

impl RankedGame<'_> {
    fn is_home_team(&self) -> bool {
        self.score.is_home_team
    }
}

struct PlanningPass<'a> {
    settings: &'a EngineSettings,
    matcher: &'a dyn ContentMatcher,
    state: &'a SystemState,
    presets: &'a ChannelPresets,
    options: &'a PlanOptions,
    ranked: Vec<RankedGame<'a>>,
    schedulable: Vec<&'a Output>,
    eligible: Vec<&'a Output>,
    inputs: Vec<&'a Input>,
    any_home_team: bool,
    ledger: PassLedger,
    placements: BTreeMap<usize, Vec<OutputAssignment>>,
    shortfalls: HashMap<usize, String>,
    defaults: Vec<DefaultAssignment>,
    reasoning: Vec<String>,
}

impl<'a> PlanningPass<'a> {
    fn new(
        settings: &'a EngineSettings,
        matcher: &'a dyn ContentMatcher,
        state: &'a SystemState,
        presets: &'a ChannelPresets,
        options: &'a PlanOptions,
        candidates: &'a [GameCandidate],
        scores: Vec<PriorityScore>,
    ) -> Self {
        let mut schedulable: Vec<&Output> = state
            .outputs
            .iter()
            .filter(|output| output.schedulable && options.allows_output(output.number))
            .collect();
        schedulable.sort_by_key(|output| output.number);
        let eligible: Vec<&Output> = schedulable
            .iter()
            .copied()
            .filter(|output| !output.is_protected(state.captured_at))
            .collect();
        let mut inputs: Vec<&Input> = state.inputs.iter().collect();
        inputs.sort_by_key(|input| input.number);

        let mut reasoning = Vec::new();
        let ranked = rank(candidates, scores, &mut reasoning);
        let any_home_team = ranked.iter().any(|(_, _, score)| score.is_home_team);
        let policy = CoveragePolicy {
            total_schedulable: schedulable.len(),
            candidate_count: ranked.len(),
            any_home_team,
            home_team_share: settings.home_team_share,
        };
        let ranked = ranked
            .into_iter()
            .map(|(candidate, key, score)| {
                let min_tvs = policy.min_tvs(&score);
                RankedGame {
                    candidate,
                    key,
                    score,
                    min_tvs,
                }
            })
            .collect();

        Self {
            settings,
            matcher,
            state,
            presets,
            options,
            ranked,
            schedulable,
            eligible,
            inputs,
            any_home_team,
            ledger: PassLedger::default(),
            placements: BTreeMap::new(),
            shortfalls: HashMap::new(),
            defaults: Vec::new(),
            reasoning,
        }
    }

    fn run(mut self) -> DistributionPlan {
        info!(
            target: "distribution",
            games = self.ranked.len(),
            schedulable = self.schedulable.len(),
            eligible = self.eligible.len(),
            home_team = self.any_home_team,
            "starting planning pass"
        );
        if self.any_home_team {
            self.note("home-team game present: home games get a majority floor, others their hint");
        } else if !self.ranked.is_empty() {
            self.note("no home-team game: spreading coverage evenly across games");
        }

        for index in 0..self.ranked.len() {
            self.allocate_by_priority(index);
        }
        self.fill_round_robin();
        self.assign_defaults();
        self.finish()
    }

    fn note(&mut self, line: impl Into<String>) {
        self.reasoning.push(line.into());
    }

    fn free_outputs(&self) -> Vec<&'a Output> {
        self.eligible
            .iter()
            .copied()
            .filter(|output| !self.ledger.is_claimed(output.number))
            .collect()
    }

    fn allocate_by_priority(&mut self, index: usize) {
        let game = &self.ranked[index];
        let min_tvs = game.min_tvs;
        let line = format!(
            "#{} {} (score {:.1}{}): needs {} TV(s)",
            index + 1,
            game.key,
            game.score.final_score,
            if game.is_home_team() { ", home team" } else { "" },
            min_tvs
        );
        self.note(line);

        let mut placed = self.reuse(index, min_tvs);
        if placed < min_tvs {
            placed += self.claim_fresh(index, min_tvs - placed);
        }
        let game = &self.ranked[index];
        if placed < min_tvs {
            warn!(
                target: "distribution",
                game = %game.key,
                placed,
                min_tvs,
                "minimum coverage not met"
            );
        }
        debug!(target: "distribution", game = %game.key, placed, "priority allocation done");
    }

    /// Claims outputs already watching an input that shows the game.
    fn reuse(&mut self, index: usize, wanted: usize) -> usize {
        let mut placed = 0;
        for input in self.inputs.clone() {
            if placed >= wanted {
                break;
            }
            let game = &self.ranked[index];
            if !input.available
                || !input.device_type.carries_games()
                || !self.options.allows_input(input.number)
                || self.settings.is_reserved(input.number)
            {
                continue;
            }
            if matches!(self.ledger.occupant(input.number), Some(other) if other != game.key) {
                continue;
            }
            if !self.matcher.is_showing(game.candidate, input) {
                continue;
            }
            let Some(channel) = game
                .candidate
                .channel_for(input)
                .or_else(|| ChannelRef::from_current(input))
            else {
                continue;
            };

            let mut outputs: Vec<&Output> = self
                .free_outputs()
                .into_iter()
                .filter(|output| output.current_input == Some(input.number))
                .collect();
            outputs.sort_by_key(|output| (game.score.zone_rank(output.zone.as_deref()), output.number));
            let taken: Vec<&Output> = outputs.into_iter().take(wanted - placed).collect();
            if taken.is_empty() {
                continue;
            }
            let key = game.key.clone();
            for output in &taken {
                self.place(index, output, input, &channel, false, AllocationPhase::Reuse);
            }
            placed += taken.len();
            info!(
                target: "distribution.reuse",
                game = %key,
                input = input.number,
                outputs = ?taken.iter().map(|o| o.number).collect::<Vec<_>>(),
                "reusing input already showing game"
            );
            self.note(format!(
                "  reuse: input {} already shows {} -> {}",
                input.number,
                key,
                output_list(&taken)
            ));
        }
        placed
    }

    fn claim_fresh(&mut self, index: usize, wanted: usize) -> usize {
        let game = &self.ranked[index];
        let mut outputs = self.free_outputs();
        if outputs.is_empty() {
            let key = game.key.clone();
            self.shortfalls
                .insert(index, "no free output left".to_string());
            self.note(format!("  fresh: no free output for {key}"));
            return 0;
        }
        outputs.sort_by_key(|output| (game.score.zone_rank(output.zone.as_deref()), output.number));

        let Some((input, channel)) = self.select_input(index, AllocationPhase::Fresh) else {
            let key = game.key.clone();
            warn!(
                target: "distribution",
                game = %key,
                "no eligible input carries a usable channel for this game"
            );
            self.shortfalls
                .insert(index, "no eligible input with a usable channel".to_string());
            self.note(format!("  fresh: no eligible input for {key}"));
            return 0;
        };

        let taken: Vec<&Output> = outputs.into_iter().take(wanted).collect();
        for output in &taken {
            let change = self.needs_change(output, input, &channel);
            self.place(index, output, input, &channel, change, AllocationPhase::Fresh);
        }
        let line = format!(
            "  fresh: input {} ({}) tuned to {} -> {}",
            input.number,
            input.device_type,
            channel,
            output_list(&taken)
        );
        self.note(line);
        taken.len()
    }

    /// Picks the least used input able to carry the game, preferring device
    /// types in configured order.
    fn select_input(&self, index: usize, phase: AllocationPhase) -> Option<(&'a Input, ChannelRef)> {
        let game = &self.ranked[index];
        let mut options: Vec<(&'a Input, ChannelRef)> = self
            .inputs
            .iter()
            .copied()
            .filter(|input| {
                input.available
                    && input.can_change_channel
                    && input.device_type.carries_games()
                    && self.options.allows_input(input.number)
                    && !self.settings.is_reserved(input.number)
            })
            .filter(|input| match self.ledger.occupant(input.number) {
                None => true,
                Some(occupant) if occupant == game.key => {
                    phase != AllocationPhase::RoundRobin || game.is_home_team()
                }
                Some(_) => false,
            })
            .filter_map(|input| {
                let channel = game.candidate.channel_for(input)?;
                self.presets.allows(&channel).then_some((input, channel))
            })
            .collect();
        options.sort_by_key(|(input, _)| {
            (
                self.ledger.usage(input.number),
                self.settings.device_rank(input.device_type),
                input.number,
            )
        });
        options.into_iter().next()
    }

    fn needs_change(&self, output: &Output, input: &Input, channel: &ChannelRef) -> bool {
        if output.current_input != Some(input.number) {
            return true;
        }
        match self.ledger.planned_channel(input.number) {
            Some(planned) => planned != channel,
            None => input
                .current_channel
                .as_deref()
                .map(|current| !current.trim().eq_ignore_ascii_case(channel.id()))
                .unwrap_or(true),
        }
    }

    fn place(
        &mut self,
        index: usize,
        output: &Output,
        input: &Input,
        channel: &ChannelRef,
        requires_channel_change: bool,
        phase: AllocationPhase,
    ) {
        let key = &self.ranked[index].key;
        self.ledger.claim_game(
            output.number,
            output.physical_group.as_deref(),
            input.number,
            key,
            channel,
        );
        self.placements
            .entry(index)
            .or_default()
            .push(OutputAssignment {
                output: output.number,
                input: input.number,
                channel: channel.clone(),
                requires_channel_change,
                phase,
                zone: output.zone.clone(),
            });
    }

    fn fill_round_robin(&mut self) {
        let idle = self.free_outputs();
        if idle.is_empty() || self.ranked.is_empty() {
            return;
        }
        let count = self.ranked.len();
        let mut rotation = 0;
        for output in idle {
            let mut chosen = None;
            let mut diversity_skips = 0;
            for offset in 0..count {
                let index = (rotation + offset) % count;
                let game = &self.ranked[index];
                if !game.is_home_team()
                    && self
                        .ledger
                        .group_has(output.physical_group.as_deref(), &game.key)
                {
                    diversity_skips += 1;
                    continue;
                }
                if let Some(found) = self.select_input(index, AllocationPhase::RoundRobin) {
                    chosen = Some((index, found));
                    break;
                }
            }
            if chosen.is_none() && diversity_skips > 0 {
                debug!(
                    target: "distribution.fill",
                    output = output.number,
                    "every game excluded by group diversity, retrying without it"
                );
                chosen = (0..count)
                    .map(|offset| (rotation + offset) % count)
                    .find_map(|index| {
                        self.select_input(index, AllocationPhase::RoundRobin)
                            .map(|found| (index, found))
                    });
            }

            let Some((index, (input, channel))) = chosen else {
                continue;
            };
            let change = self.needs_change(output, input, &channel);
            self.place(index, output, input, &channel, change, AllocationPhase::RoundRobin);
            rotation = (index + 1) % count;
            let line = format!(
                "round-robin: {} -> {} via input {} ({})",
                output.display_name(),
                self.ranked[index].key,
                input.number,
                channel
            );
            info!(target: "distribution.fill", output = output.number, input = input.number, game = %self.ranked[index].key, "round-robin fill");
            self.note(line);
        }
    }

    fn default_inputs(&self) -> (Option<u32>, Option<u32>) {
        let exists = |number: &u32| self.state.input(*number).is_some();
        let news = self.settings.sports_news_input.filter(exists);
        let ambient = self.settings.ambient_input.filter(exists).or_else(|| {
            self.inputs
                .iter()
                .find(|input| input.device_type == DeviceType::Ambient)
                .map(|input| input.number)
        });
        (news, ambient)
    }

    fn assign_defaults(&mut self) {
        let (news, ambient) = self.default_inputs();
        for output in self.free_outputs() {
            let news = news.map(|input| (input, DefaultContentKind::SportsNews));
            let ambient = ambient.map(|input| (input, DefaultContentKind::Ambient));
            let choice = if self.settings.primary_zone_types.contains(&output.zone_type) {
                news.or(ambient)
            } else {
                ambient.or(news)
            };
            let Some((input, kind)) = choice else {
                warn!(
                    target: "distribution.defaults",
                    output = output.number,
                    "no default-content input available, output stays idle"
                );
                self.note(format!("idle: {} has no default content", output.display_name()));
                continue;
            };
            self.ledger.claim_default(output.number);
            self.defaults.push(DefaultAssignment {
                output: output.number,
                input,
                kind,
                requires_channel_change: output.current_input != Some(input),
            });
            self.note(format!(
                "default: {} ({}) -> {} on input {}",
                output.display_name(),
                output.zone_type,
                kind,
                input
            ));
        }
    }

    fn finish(mut self) -> DistributionPlan {
        let mut game_assignments = Vec::new();
        let mut unplaced = Vec::new();
        for (index, game) in self.ranked.iter().enumerate() {
            match self.placements.remove(&index) {
                Some(assignments) => {
                    let min_tvs_met = assignments.len() >= game.min_tvs;
                    game_assignments.push(GameAssignment {
                        game_key: game.key.clone(),
                        candidate: game.candidate.clone(),
                        priority: game.score.clone(),
                        assignments,
                        min_tvs: game.min_tvs,
                        min_tvs_met,
                    });
                }
                None => unplaced.push(UnplacedCandidate {
                    game_key: game.key.clone(),
                    final_score: game.score.final_score,
                    is_home_team: game.is_home_team(),
                    min_tvs: game.min_tvs,
                    reason: self
                        .shortfalls
                        .remove(&index)
                        .unwrap_or_else(|| "no eligible input or output".to_string()),
                }),
            }
        }

        let game_outputs: usize = game_assignments.iter().map(GameAssignment::output_count).sum();
        let channel_changes = game_assignments
            .iter()
            .flat_map(|game| game.assignments.iter())
            .filter(|assignment| assignment.requires_channel_change)
            .count()
            + self
                .defaults
                .iter()
                .filter(|assignment| assignment.requires_channel_change)
                .count();
        let summary = PlanSummary {
            total_outputs: self.state.outputs.len(),
            schedulable_outputs: self.schedulable.len(),
            protected_outputs: self.schedulable.len() - self.eligible.len(),
            games_scheduled: game_assignments.len(),
            game_outputs,
            default_outputs: self.defaults.len(),
            idle_outputs: self.free_outputs().len(),
            min_tvs_unmet: game_assignments
                .iter()
                .filter(|game| !game.min_tvs_met)
                .count()
                + unplaced.len(),
            channel_changes,
            home_team_present: self.any_home_team,
        };
        info!(
            target: "distribution",
            games = summary.games_scheduled,
            game_outputs = summary.game_outputs,
            defaults = summary.default_outputs,
            idle = summary.idle_outputs,
            unmet = summary.min_tvs_unmet,
            "planning pass finished"
        );

        DistributionPlan {
            plan_id: Uuid::new_v4(),
            created_at: Utc::now(),
            state_captured_at: self.state.captured_at,
            game_assignments,
            default_assignments: self.defaults,
            unplaced,
            summary,
            reasoning: self.reasoning,
        }
    }
}

/// Joins candidates with their scores and orders them by descending score.
/// Games without a positive score are dropped.
fn rank<'a>(
    candidates: &'a [GameCandidate],
    scores: Vec<PriorityScore>,
    reasoning: &mut Vec<String>,
) -> Vec<(&'a GameCandidate, String, PriorityScore)> {
    let mut by_key: HashMap<String, PriorityScore> = HashMap::new();
    for score in scores {
        by_key.entry(score.game_key.clone()).or_insert(score);
    }

    let mut seen = BTreeSet::new();
    let mut ranked = Vec::new();
    for candidate in candidates {
        let key = candidate.key();
        if !seen.insert(key.clone()) {
            warn!(target: "distribution", game = %key, "duplicate candidate ignored");
            continue;
        }
        let Some(score) = by_key.remove(&key) else {
            warn!(target: "distribution", game = %key, "oracle returned no score, skipping");
            continue;
        };
        if score.final_score.is_nan() || score.final_score <= 0.0 {
            reasoning.push(format!("skip: {key} has score {:.1}", score.final_score));
            continue;
        }
        ranked.push((candidate, key, score));
    }
    ranked.sort_by(|a, b| {
        b.2.final_score
            .partial_cmp(&a.2.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

fn output_list(outputs: &[&Output]) -> String {
    outputs
        .iter()
        .map(|output| output.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
