use thiserror::Error;

use crate::games::OracleError;
use crate::venue::ProviderError;

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("state provider error: {0}")]
    State(#[from] ProviderError),
    #[error("priority oracle error: {0}")]
    Oracle(#[from] OracleError),
}

pub type DistributionResult<T> = std::result::Result<T, DistributionError>;
