use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::games::{ChannelRef, GameCandidate, PriorityScore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPhase {
    /// Output was already watching an input showing the game.
    Reuse,
    /// Priority-ordered claim of a freshly tuned input.
    Fresh,
    /// Idle output filled by the round-robin pass.
    RoundRobin,
}

impl fmt::Display for AllocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AllocationPhase::Reuse => "reuse",
            AllocationPhase::Fresh => "fresh",
            AllocationPhase::RoundRobin => "round_robin",
        };
        f.write_str(label)
    }
}

/// One output → input → channel triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputAssignment {
    pub output: u32,
    pub input: u32,
    pub channel: ChannelRef,
    pub requires_channel_change: bool,
    pub phase: AllocationPhase,
    #[serde(default)]
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameAssignment {
    pub game_key: String,
    pub candidate: GameCandidate,
    pub priority: PriorityScore,
    pub assignments: Vec<OutputAssignment>,
    pub min_tvs: usize,
    pub min_tvs_met: bool,
}

impl GameAssignment {
    pub fn output_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn outputs(&self) -> impl Iterator<Item = u32> + '_ {
        self.assignments.iter().map(|assignment| assignment.output)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefaultContentKind {
    SportsNews,
    Ambient,
}

impl fmt::Display for DefaultContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultContentKind::SportsNews => f.write_str("sports_news"),
            DefaultContentKind::Ambient => f.write_str("ambient"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultAssignment {
    pub output: u32,
    pub input: u32,
    pub kind: DefaultContentKind,
    pub requires_channel_change: bool,
}

/// A positive-score game that ended the pass without any output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnplacedCandidate {
    pub game_key: String,
    pub final_score: f64,
    pub is_home_team: bool,
    pub min_tvs: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlanSummary {
    pub total_outputs: usize,
    pub schedulable_outputs: usize,
    pub protected_outputs: usize,
    pub games_scheduled: usize,
    pub game_outputs: usize,
    pub default_outputs: usize,
    pub idle_outputs: usize,
    pub min_tvs_unmet: usize,
    pub channel_changes: usize,
    pub home_team_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionPlan {
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state_captured_at: DateTime<Utc>,
    pub game_assignments: Vec<GameAssignment>,
    pub default_assignments: Vec<DefaultAssignment>,
    #[serde(default)]
    pub unplaced: Vec<UnplacedCandidate>,
    pub summary: PlanSummary,
    #[serde(default)]
    pub reasoning: Vec<String>,
}

impl DistributionPlan {
    pub fn game_for_output(&self, output: u32) -> Option<&GameAssignment> {
        self.game_assignments
            .iter()
            .find(|game| game.outputs().any(|number| number == output))
    }

    pub fn default_for_output(&self, output: u32) -> Option<&DefaultAssignment> {
        self.default_assignments
            .iter()
            .find(|assignment| assignment.output == output)
    }

    /// Every output number named by the plan, games first, in plan order.
    /// Duplicates are kept so callers can detect them.
    pub fn assigned_outputs(&self) -> Vec<u32> {
        self.game_assignments
            .iter()
            .flat_map(|game| game.outputs())
            .chain(self.default_assignments.iter().map(|assignment| assignment.output))
            .collect()
    }
}
