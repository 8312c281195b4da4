use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::models::DistributionPlan;
use crate::actuation::{ActuationResult, HardwareActuator};
use crate::games::ChannelRef;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStep {
    Tune,
    Launch,
    Route,
}

impl fmt::Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStep::Tune => f.write_str("tune"),
            ExecutionStep::Launch => f.write_str("launch"),
            ExecutionStep::Route => f.write_str("route"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionFailure {
    pub output: Option<u32>,
    pub input: u32,
    pub step: ExecutionStep,
    pub error: String,
}

/// Route counts, one per output whose assignment needs a change. Outputs
/// already showing their planned content are only counted as `unchanged`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionReport {
    pub unchanged: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<ExecutionFailure>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    fn absorb(&mut self, other: ExecutionReport) {
        self.unchanged += other.unchanged;
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

#[derive(Debug)]
struct InputJob {
    input: u32,
    channel: Option<ChannelRef>,
    outputs: Vec<u32>,
}

/// Applies a plan through a [`HardwareActuator`]. Each input is tuned once
/// before any output is routed to it; inputs are handled concurrently.
pub struct PlanExecutor {
    actuator: Arc<dyn HardwareActuator>,
}

impl PlanExecutor {
    pub fn new(actuator: Arc<dyn HardwareActuator>) -> Self {
        Self { actuator }
    }

    pub async fn execute(&self, plan: &DistributionPlan) -> ExecutionReport {
        let (jobs, unchanged) = jobs_for(plan);
        info!(
            target: "executor",
            plan_id = %plan.plan_id,
            inputs = jobs.len(),
            unchanged,
            "executing plan"
        );
        let results = join_all(jobs.iter().map(|job| self.run_job(job))).await;

        let mut report = ExecutionReport {
            unchanged,
            ..ExecutionReport::default()
        };
        for result in results {
            report.absorb(result);
        }
        info!(
            target: "executor",
            plan_id = %plan.plan_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "plan executed"
        );
        report
    }

    async fn run_job(&self, job: &InputJob) -> ExecutionReport {
        let mut report = ExecutionReport {
            attempted: job.outputs.len(),
            ..ExecutionReport::default()
        };

        if let Some(channel) = &job.channel {
            let (step, result) = self.prepare(job.input, channel).await;
            if let Err(error) = result {
                warn!(
                    target: "executor",
                    input = job.input,
                    %step,
                    %error,
                    "input preparation failed, skipping its outputs"
                );
                report.skipped = job.outputs.len();
                report.failures.push(ExecutionFailure {
                    output: None,
                    input: job.input,
                    step,
                    error: error.to_string(),
                });
                return report;
            }
        }

        for &output in &job.outputs {
            match self.actuator.route(output, job.input).await {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    warn!(target: "executor", output, input = job.input, %error, "route failed");
                    report.failed += 1;
                    report.failures.push(ExecutionFailure {
                        output: Some(output),
                        input: job.input,
                        step: ExecutionStep::Route,
                        error: error.to_string(),
                    });
                }
            }
        }
        report
    }

    async fn prepare(
        &self,
        input: u32,
        channel: &ChannelRef,
    ) -> (ExecutionStep, ActuationResult<()>) {
        match channel {
            ChannelRef::Streaming {
                app_id, deep_link, ..
            } => (
                ExecutionStep::Launch,
                self.actuator
                    .launch_app(input, app_id, deep_link.as_deref())
                    .await,
            ),
            _ => (ExecutionStep::Tune, self.actuator.tune(input, channel).await),
        }
    }
}

/// Groups the changed part of the plan by input. Game inputs carry the
/// channel to tune; default inputs are routed as they are.
fn jobs_for(plan: &DistributionPlan) -> (Vec<InputJob>, usize) {
    let mut jobs: BTreeMap<u32, InputJob> = BTreeMap::new();
    let mut unchanged = 0;
    for game in &plan.game_assignments {
        for assignment in &game.assignments {
            if !assignment.requires_channel_change {
                unchanged += 1;
                continue;
            }
            let job = jobs.entry(assignment.input).or_insert_with(|| InputJob {
                input: assignment.input,
                channel: None,
                outputs: Vec::new(),
            });
            if job.channel.is_none() {
                job.channel = Some(assignment.channel.clone());
            }
            job.outputs.push(assignment.output);
        }
    }
    for default in &plan.default_assignments {
        if !default.requires_channel_change {
            unchanged += 1;
            continue;
        }
        jobs.entry(default.input)
            .or_insert_with(|| InputJob {
                input: default.input,
                channel: None,
                outputs: Vec::new(),
            })
            .outputs
            .push(default.output);
    }
    (jobs.into_values().collect(), unchanged)
}
