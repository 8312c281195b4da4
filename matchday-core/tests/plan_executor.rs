use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use matchday_core::actuation::{
    ActuationCommand, ActuationError, ActuationResult, DryRunActuator, HardwareActuator,
};
use matchday_core::distribution::{
    AllocationPhase, DefaultAssignment, DefaultContentKind, DistributionPlan, ExecutionStep,
    GameAssignment, OutputAssignment, PlanExecutor, PlanSummary,
};
use matchday_core::games::{ChannelRef, GameCandidate, PriorityScore};

fn cable(channel: &str) -> ChannelRef {
    ChannelRef::Cable {
        channel: channel.into(),
    }
}

fn assignment(output: u32, input: u32, channel: &str, change: bool) -> OutputAssignment {
    OutputAssignment {
        output,
        input,
        channel: cable(channel),
        requires_channel_change: change,
        phase: if change {
            AllocationPhase::Fresh
        } else {
            AllocationPhase::Reuse
        },
        zone: None,
    }
}

fn game(home: &str, away: &str, assignments: Vec<OutputAssignment>) -> GameAssignment {
    let candidate = GameCandidate::new(home, away);
    let key = candidate.key();
    GameAssignment {
        game_key: key.clone(),
        candidate,
        priority: PriorityScore::new(key, 70.0),
        min_tvs: 1,
        min_tvs_met: true,
        assignments,
    }
}

fn ambient(output: u32, change: bool) -> DefaultAssignment {
    DefaultAssignment {
        output,
        input: 9,
        kind: DefaultContentKind::Ambient,
        requires_channel_change: change,
    }
}

fn plan(games: Vec<GameAssignment>, defaults: Vec<DefaultAssignment>) -> DistributionPlan {
    DistributionPlan {
        plan_id: Uuid::new_v4(),
        created_at: Utc::now(),
        state_captured_at: Utc::now(),
        game_assignments: games,
        default_assignments: defaults,
        unplaced: Vec::new(),
        summary: PlanSummary::default(),
        reasoning: Vec::new(),
    }
}

#[tokio::test]
async fn tunes_before_routing_and_skips_unchanged_outputs() {
    let plan = plan(
        vec![game(
            "Packers",
            "Bears",
            vec![
                assignment(4, 1, "206", false),
                assignment(1, 1, "206", true),
                assignment(2, 1, "206", true),
            ],
        )],
        vec![ambient(3, true), ambient(5, false)],
    );
    let actuator = Arc::new(DryRunActuator::new());

    let report = PlanExecutor::new(actuator.clone()).execute(&plan).await;

    assert_eq!(report.unchanged, 2);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 3);
    assert!(report.is_clean());

    let commands = actuator.commands();
    assert_eq!(commands.len(), 4);
    let position = |wanted: &ActuationCommand| {
        commands
            .iter()
            .position(|command| command == wanted)
            .expect("command issued")
    };
    let tune = position(&ActuationCommand::Tune {
        input: 1,
        channel: cable("206"),
    });
    assert!(tune < position(&ActuationCommand::Route { output: 1, input: 1 }));
    assert!(tune < position(&ActuationCommand::Route { output: 2, input: 1 }));
    position(&ActuationCommand::Route { output: 3, input: 9 });
    assert!(!commands
        .iter()
        .any(|command| matches!(command, ActuationCommand::Route { output: 4, .. })));
}

/// Fails the tune of one input and the route of one output, recording the
/// rest.
#[derive(Default)]
struct FlakyActuator {
    broken_input: u32,
    broken_output: u32,
    routed: Mutex<Vec<u32>>,
}

#[async_trait]
impl HardwareActuator for FlakyActuator {
    async fn tune(&self, input: u32, _channel: &ChannelRef) -> ActuationResult<()> {
        if input == self.broken_input {
            return Err(ActuationError::Device(format!("input {input} not responding")));
        }
        Ok(())
    }

    async fn launch_app(
        &self,
        _input: u32,
        _app_id: &str,
        _deep_link: Option<&str>,
    ) -> ActuationResult<()> {
        Ok(())
    }

    async fn route(&self, output: u32, _input: u32) -> ActuationResult<()> {
        if output == self.broken_output {
            return Err(ActuationError::Rejected {
                command: format!("outputs/{output}/route"),
                status: 503,
            });
        }
        self.routed.lock().unwrap().push(output);
        Ok(())
    }
}

#[tokio::test]
async fn failures_do_not_stop_the_rest_of_the_plan() {
    let plan = plan(
        vec![
            game(
                "Packers",
                "Bears",
                vec![assignment(1, 1, "206", true), assignment(2, 1, "206", true)],
            ),
            game("Lions", "Vikings", vec![assignment(3, 2, "208", true)]),
        ],
        vec![ambient(4, true)],
    );
    let actuator = Arc::new(FlakyActuator {
        broken_input: 2,
        broken_output: 1,
        ..FlakyActuator::default()
    });

    let report = PlanExecutor::new(actuator.clone()).execute(&plan).await;

    assert_eq!(report.attempted, 4);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .any(|failure| failure.step == ExecutionStep::Tune && failure.input == 2));
    assert!(report
        .failures
        .iter()
        .any(|failure| failure.step == ExecutionStep::Route && failure.output == Some(1)));

    let mut routed = actuator.routed.lock().unwrap().clone();
    routed.sort_unstable();
    assert_eq!(routed, vec![2, 4]);
}
