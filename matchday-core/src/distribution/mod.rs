pub mod engine;
pub mod error;
pub mod executor;
mod ledger;
pub mod matcher;
pub mod models;
pub mod validation;

pub use engine::{ChannelPresets, DistributionEngine, EngineSettings, PlanOptions};
pub use error::{DistributionError, DistributionResult};
pub use executor::{ExecutionFailure, ExecutionReport, ExecutionStep, PlanExecutor};
pub use matcher::{
    default_matcher, ChainedMatcher, ChannelIdMatcher, ContentMatcher, TeamNameMatcher,
};
pub use models::{
    AllocationPhase, DefaultAssignment, DefaultContentKind, DistributionPlan, GameAssignment,
    OutputAssignment, PlanSummary, UnplacedCandidate,
};
pub use validation::{validate_plan, PlanValidation, PlanViolation, ViolationKind};
