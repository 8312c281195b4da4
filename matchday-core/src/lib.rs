pub mod actuation;
pub mod config;
pub mod distribution;
pub mod error;
pub mod games;
pub mod streaming;
pub mod venue;

pub use actuation::{
    ActuationCommand, ActuationError, ActuationResult, DryRunActuator, HardwareActuator,
    HttpActuator,
};
pub use config::{
    load_matchday_config, ActuationSection, DefaultsSection, DistributionSection, MatchdayConfig,
    PlatformOverride, StreamingSection, VenueSection,
};
pub use distribution::{
    validate_plan, DistributionEngine, DistributionError, DistributionPlan, DistributionResult,
    EngineSettings, ExecutionReport, PlanExecutor, PlanOptions, PlanValidation,
};
pub use error::{ConfigError, Result};
pub use games::{ChannelRef, GameCandidate, PriorityOracle, PriorityScore, ScoreTable};
pub use streaming::{
    PlatformCatalog, PlatformId, StaticDeviceRegistry, StreamingCandidate, StreamingDetector,
};
pub use venue::{SnapshotFile, StateProvider, SystemState};
