use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use matchday_core::distribution::{
    validate_plan, AllocationPhase, DefaultContentKind, DistributionEngine, DistributionError,
    DistributionPlan, EngineSettings, PlanOptions,
};
use matchday_core::games::{
    GameCandidate, OracleError, OracleResult, PriorityOracle, PriorityScore, ScoreTable,
};
use matchday_core::venue::{
    DeviceType, Input, Output, SnapshotDocument, SnapshotFile, SystemState, ZoneType,
};

fn settings() -> EngineSettings {
    EngineSettings {
        sports_news_input: Some(5),
        ambient_input: Some(9),
        ..EngineSettings::default()
    }
}

fn cable_inputs(numbers: &[u32]) -> Vec<Input> {
    let mut inputs: Vec<Input> = numbers
        .iter()
        .map(|number| Input::new(*number, DeviceType::Cable))
        .collect();
    inputs.push(Input::new(5, DeviceType::Cable));
    inputs.push(Input::new(9, DeviceType::Ambient));
    inputs
}

fn estate(outputs: Vec<Output>, inputs: Vec<Input>) -> SystemState {
    let mut state = SystemState::new(Utc::now());
    state.outputs = outputs;
    state.inputs = inputs;
    state
}

fn outputs(count: u32) -> Vec<Output> {
    (1..=count).map(Output::new).collect()
}

fn cable_game(home: &str, away: &str, channel: &str) -> GameCandidate {
    let mut game = GameCandidate::new(home, away);
    game.cable_channel = Some(channel.into());
    game
}

fn engine(state: SystemState, scores: Vec<PriorityScore>) -> DistributionEngine {
    let snapshot = SnapshotFile::from_document(SnapshotDocument {
        state,
        cable_presets: BTreeSet::new(),
        satellite_presets: BTreeSet::new(),
    });
    DistributionEngine::new(
        Arc::new(snapshot),
        Arc::new(ScoreTable::new(scores)),
        settings(),
    )
}

/// Every listed output is named exactly once across games and defaults.
fn assert_exhaustive(plan: &DistributionPlan, expected: &[u32]) {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for output in plan.assigned_outputs() {
        *counts.entry(output).or_insert(0) += 1;
    }
    for output in expected {
        assert_eq!(
            counts.get(output).copied(),
            Some(1),
            "output {output} should appear exactly once"
        );
    }
    assert_eq!(counts.len(), expected.len(), "unexpected outputs: {counts:?}");
}

#[tokio::test]
async fn home_team_gets_at_least_half_the_estate() {
    let games = vec![cable_game("Packers", "Bears", "206")];
    let scores = vec![PriorityScore::new("Bears @ Packers", 95.0).home_team()];
    let engine = engine(estate(outputs(4), cable_inputs(&[1, 2])), scores);

    let plan = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("plan");

    let home = &plan.game_assignments[0];
    assert_eq!(home.min_tvs, 2);
    assert!(home.output_count() >= 2);
    assert!(home.min_tvs_met);
    assert!(plan.summary.home_team_present);
    assert_exhaustive(&plan, &[1, 2, 3, 4]);
    assert!(validate_plan(&plan, 90.0).valid);
}

#[tokio::test]
async fn candidate_without_channel_falls_through() {
    let games = vec![
        cable_game("Packers", "Bears", "206"),
        GameCandidate::new("Lions", "Vikings"),
    ];
    let scores = vec![
        PriorityScore::new("Bears @ Packers", 80.0),
        PriorityScore::new("Vikings @ Lions", 70.0),
    ];
    let engine = engine(estate(outputs(4), cable_inputs(&[1, 2])), scores);

    let plan = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("plan");

    assert_eq!(plan.game_assignments.len(), 1);
    assert_eq!(plan.game_assignments[0].game_key, "Bears @ Packers");
    assert_eq!(plan.unplaced.len(), 1);
    assert_eq!(plan.unplaced[0].game_key, "Vikings @ Lions");
    assert_eq!(plan.summary.min_tvs_unmet, 1);
    assert_exhaustive(&plan, &[1, 2, 3, 4]);
    assert_eq!(
        plan.default_for_output(4).map(|default| default.kind),
        Some(DefaultContentKind::Ambient)
    );
}

#[tokio::test]
async fn reuses_outputs_already_watching_the_game() {
    let mut state_outputs = outputs(4);
    state_outputs[1].current_input = Some(3);
    state_outputs[3].current_input = Some(3);
    let mut inputs = cable_inputs(&[1, 2]);
    let mut satellite = Input::new(3, DeviceType::Satellite);
    satellite.current_channel = Some("212".into());
    inputs.push(satellite);

    let mut game = cable_game("Packers", "Bears", "206");
    game.satellite_channel = Some("212".into());
    let scores = vec![PriorityScore::new("Bears @ Packers", 60.0)];
    let engine = engine(estate(state_outputs, inputs), scores);

    let plan = engine
        .create_plan(&[game], &PlanOptions::default())
        .await
        .expect("plan");

    let assignments = &plan.game_assignments[0].assignments;
    let reused: Vec<u32> = assignments
        .iter()
        .filter(|assignment| assignment.phase == AllocationPhase::Reuse)
        .map(|assignment| assignment.output)
        .collect();
    assert_eq!(reused, vec![2, 4]);
    assert!(assignments[..2]
        .iter()
        .all(|assignment| assignment.phase == AllocationPhase::Reuse
            && !assignment.requires_channel_change
            && assignment.input == 3));
    assert!(assignments[2..]
        .iter()
        .all(|assignment| assignment.phase == AllocationPhase::Fresh
            && assignment.requires_channel_change));
}

#[tokio::test]
async fn round_robin_keeps_groups_diverse() {
    let mut state_outputs = outputs(8);
    state_outputs[4].physical_group = Some("right".into());
    state_outputs[7].physical_group = Some("right".into());
    let games = vec![
        cable_game("Packers", "Bears", "200"),
        cable_game("Lions", "Vikings", "201"),
        cable_game("Rams", "Seahawks", "202"),
    ];
    let scores = vec![
        PriorityScore::new("Bears @ Packers", 95.0).home_team(),
        PriorityScore::new("Vikings @ Lions", 80.0),
        PriorityScore::new("Seahawks @ Rams", 70.0),
    ];
    let engine = engine(
        estate(state_outputs, cable_inputs(&[1, 2, 3, 4, 6])),
        scores,
    );

    let plan = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("plan");

    let lions = plan
        .game_for_output(5)
        .expect("output 5 carries a game");
    assert_eq!(lions.game_key, "Vikings @ Lions");
    let right_neighbour = plan
        .game_for_output(8)
        .expect("output 8 carries a game");
    assert_ne!(right_neighbour.game_key, "Vikings @ Lions");
    assert_eq!(right_neighbour.game_key, "Seahawks @ Rams");
    assert_eq!(
        right_neighbour
            .assignments
            .iter()
            .filter(|assignment| assignment.phase == AllocationPhase::RoundRobin)
            .count(),
        1
    );
    assert_exhaustive(&plan, &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(validate_plan(&plan, 90.0).valid);
}

#[tokio::test]
async fn protected_and_unschedulable_outputs_are_left_alone() {
    let mut state_outputs = outputs(4);
    state_outputs[1].manual_override_until = Some(Utc::now() + Duration::hours(1));
    state_outputs[2].schedulable = false;
    state_outputs[0].zone_type = ZoneType::Bar;
    let games = vec![cable_game("Packers", "Bears", "206")];
    let scores = vec![PriorityScore::new("Bears @ Packers", 60.0)];
    let engine = engine(estate(state_outputs, cable_inputs(&[1])), scores);

    let plan = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("plan");

    let assigned = plan.assigned_outputs();
    assert!(!assigned.contains(&2));
    assert!(!assigned.contains(&3));
    assert_eq!(plan.summary.schedulable_outputs, 3);
    assert_eq!(plan.summary.protected_outputs, 1);
    assert_eq!(plan.game_assignments[0].min_tvs, 3);
    assert!(!plan.game_assignments[0].min_tvs_met);
}

#[tokio::test]
async fn identical_inputs_give_identical_plans() {
    let mut state_outputs = outputs(6);
    state_outputs[0].zone_type = ZoneType::Main;
    state_outputs[5].physical_group = Some("wall".into());
    state_outputs[4].physical_group = Some("wall".into());
    let state = estate(state_outputs, cable_inputs(&[1, 2, 3]));
    let games = vec![
        cable_game("Packers", "Bears", "206"),
        cable_game("Lions", "Vikings", "208"),
        GameCandidate::new("Jets", "Giants"),
    ];
    let scores = vec![
        PriorityScore::new("Bears @ Packers", 75.0),
        PriorityScore::new("Vikings @ Lions", 75.0),
        PriorityScore::new("Giants @ Jets", 40.0),
    ];
    let engine = engine(state, scores);

    let first = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("first plan");
    let second = engine
        .create_plan(&games, &PlanOptions::default())
        .await
        .expect("second plan");

    assert_ne!(first.plan_id, second.plan_id);
    assert_eq!(first.game_assignments, second.game_assignments);
    assert_eq!(first.default_assignments, second.default_assignments);
    assert_eq!(first.unplaced, second.unplaced);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.reasoning, second.reasoning);
}

struct FailingOracle;

#[async_trait]
impl PriorityOracle for FailingOracle {
    async fn score(&self, _candidates: &[GameCandidate]) -> OracleResult<Vec<PriorityScore>> {
        Err(OracleError::Failed("ranking service down".into()))
    }
}

#[tokio::test]
async fn oracle_failure_aborts_the_pass() {
    let snapshot = SnapshotFile::from_document(SnapshotDocument {
        state: estate(outputs(2), cable_inputs(&[1])),
        cable_presets: BTreeSet::new(),
        satellite_presets: BTreeSet::new(),
    });
    let engine = DistributionEngine::new(Arc::new(snapshot), Arc::new(FailingOracle), settings());

    let err = engine
        .create_plan(&[cable_game("Packers", "Bears", "206")], &PlanOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DistributionError::Oracle(_)));
}

#[tokio::test]
async fn unknown_preset_channel_is_skipped() {
    let snapshot = SnapshotFile::from_document(SnapshotDocument {
        state: estate(outputs(2), cable_inputs(&[1])),
        cable_presets: ["206".to_string()].into_iter().collect(),
        satellite_presets: BTreeSet::new(),
    });
    let scores = vec![PriorityScore::new("Vikings @ Lions", 80.0)];
    let engine = DistributionEngine::new(
        Arc::new(snapshot),
        Arc::new(ScoreTable::new(scores)),
        settings(),
    );

    let plan = engine
        .create_plan(&[cable_game("Lions", "Vikings", "999")], &PlanOptions::default())
        .await
        .expect("plan");

    assert!(plan.game_assignments.is_empty());
    assert_eq!(plan.unplaced.len(), 1);
    assert_eq!(plan.summary.default_outputs, 2);
}
