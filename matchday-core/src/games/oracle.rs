use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::models::{GameCandidate, PriorityScore};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to read score table {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse score table {path}: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("priority oracle failed: {0}")]
    Failed(String),
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// External ranking: one score per candidate, highest first.
#[async_trait]
pub trait PriorityOracle: Send + Sync {
    async fn score(&self, candidates: &[GameCandidate]) -> OracleResult<Vec<PriorityScore>>;
}

/// Fixed table of scores keyed by game key. Candidates without an entry get
/// `default_score`, which is zero (never scheduled) unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    entries: HashMap<String, PriorityScore>,
    default_score: f64,
}

impl ScoreTable {
    pub fn new(scores: Vec<PriorityScore>) -> Self {
        Self {
            entries: scores
                .into_iter()
                .map(|score| (score.game_key.clone(), score))
                .collect(),
            default_score: 0.0,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> OracleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OracleError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        let scores: Vec<PriorityScore> =
            serde_json::from_str(&content).map_err(|source| OracleError::Parse {
                source,
                path: path.to_path_buf(),
            })?;
        Ok(Self::new(scores))
    }

    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }
}

#[async_trait]
impl PriorityOracle for ScoreTable {
    async fn score(&self, candidates: &[GameCandidate]) -> OracleResult<Vec<PriorityScore>> {
        let mut scores: Vec<PriorityScore> = candidates
            .iter()
            .map(|candidate| {
                let key = candidate.key();
                self.entries
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| PriorityScore::new(key, self.default_score))
            })
            .collect();
        scores.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(scores)
    }
}
