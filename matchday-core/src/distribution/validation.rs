use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::DistributionPlan;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DuplicateGameOutput,
    GameDefaultConflict,
    DuplicateDefaultOutput,
    MinimumNotMet,
    InputConflict,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ViolationKind::DuplicateGameOutput => "duplicate_game_output",
            ViolationKind::GameDefaultConflict => "game_default_conflict",
            ViolationKind::DuplicateDefaultOutput => "duplicate_default_output",
            ViolationKind::MinimumNotMet => "minimum_not_met",
            ViolationKind::InputConflict => "input_conflict",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanViolation {
    pub kind: ViolationKind,
    #[serde(default)]
    pub output: Option<u32>,
    #[serde(default)]
    pub game_key: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlanValidation {
    pub valid: bool,
    pub violations: Vec<PlanViolation>,
}

impl PlanValidation {
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations
            .iter()
            .filter(|violation| violation.kind == kind)
            .count()
    }
}

/// Checks the structural guarantees of a plan: no output booked twice, every
/// input tuned to a single channel, and high-priority games at their minimum.
pub fn validate_plan(plan: &DistributionPlan, high_priority_threshold: f64) -> PlanValidation {
    let mut violations = Vec::new();

    let mut game_outputs: BTreeMap<u32, &str> = BTreeMap::new();
    let mut input_channels: BTreeMap<u32, (&str, String)> = BTreeMap::new();
    for game in &plan.game_assignments {
        for assignment in &game.assignments {
            if let Some(previous) = game_outputs.insert(assignment.output, game.game_key.as_str()) {
                violations.push(PlanViolation {
                    kind: ViolationKind::DuplicateGameOutput,
                    output: Some(assignment.output),
                    game_key: Some(game.game_key.clone()),
                    detail: format!(
                        "output {} assigned to both {previous} and {}",
                        assignment.output, game.game_key
                    ),
                });
            }
            let channel = assignment.channel.to_string();
            match input_channels.get(&assignment.input) {
                Some((owner, planned)) if *planned != channel => {
                    violations.push(PlanViolation {
                        kind: ViolationKind::InputConflict,
                        output: Some(assignment.output),
                        game_key: Some(game.game_key.clone()),
                        detail: format!(
                            "input {} tuned to {planned} for {owner} and {channel} for {}",
                            assignment.input, game.game_key
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    input_channels.insert(assignment.input, (game.game_key.as_str(), channel));
                }
            }
        }
    }

    let mut default_outputs = BTreeSet::new();
    for default in &plan.default_assignments {
        if let Some(game) = game_outputs.get(&default.output) {
            violations.push(PlanViolation {
                kind: ViolationKind::GameDefaultConflict,
                output: Some(default.output),
                game_key: Some(game.to_string()),
                detail: format!(
                    "output {} carries {game} and default {}",
                    default.output, default.kind
                ),
            });
        }
        if !default_outputs.insert(default.output) {
            violations.push(PlanViolation {
                kind: ViolationKind::DuplicateDefaultOutput,
                output: Some(default.output),
                game_key: None,
                detail: format!("output {} has more than one default", default.output),
            });
        }
    }

    for game in &plan.game_assignments {
        if game.priority.final_score >= high_priority_threshold
            && game.output_count() < game.min_tvs
        {
            violations.push(PlanViolation {
                kind: ViolationKind::MinimumNotMet,
                output: None,
                game_key: Some(game.game_key.clone()),
                detail: format!(
                    "{} (score {:.1}) on {} of {} required TVs",
                    game.game_key,
                    game.priority.final_score,
                    game.output_count(),
                    game.min_tvs
                ),
            });
        }
    }
    for unplaced in &plan.unplaced {
        if unplaced.final_score >= high_priority_threshold {
            violations.push(PlanViolation {
                kind: ViolationKind::MinimumNotMet,
                output: None,
                game_key: Some(unplaced.game_key.clone()),
                detail: format!(
                    "{} (score {:.1}) not placed: {}",
                    unplaced.game_key, unplaced.final_score, unplaced.reason
                ),
            });
        }
    }

    PlanValidation {
        valid: violations.is_empty(),
        violations,
    }
}
