pub mod models;
pub mod oracle;

pub use models::{ChannelRef, GameCandidate, MatchedTeam, PriorityScore, StreamingRoute};
pub use oracle::{OracleError, OracleResult, PriorityOracle, ScoreTable};
