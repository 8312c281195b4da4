use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{ChannelCategory, SystemState};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("state provider unavailable: {0}")]
    Unavailable(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Read-only source of live estate state, refreshed once per planning pass.
#[async_trait]
pub trait StateProvider: Send + Sync {
    async fn snapshot(&self) -> ProviderResult<SystemState>;

    /// Channel ids that actually exist in the venue presets for `category`.
    async fn valid_channels(&self, category: ChannelCategory) -> ProviderResult<BTreeSet<String>>;
}

/// Snapshot document: the live state plus the preset channel lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotDocument {
    pub state: SystemState,
    #[serde(default)]
    pub cable_presets: BTreeSet<String>,
    #[serde(default)]
    pub satellite_presets: BTreeSet<String>,
}

/// Serves a fixed snapshot, either held in memory or read from a JSON file on
/// every call.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    source: SnapshotSource,
}

#[derive(Debug, Clone)]
enum SnapshotSource {
    Path(PathBuf),
    Inline(SnapshotDocument),
}

impl SnapshotFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: SnapshotSource::Path(path.as_ref().to_path_buf()),
        }
    }

    pub fn from_document(document: SnapshotDocument) -> Self {
        Self {
            source: SnapshotSource::Inline(document),
        }
    }

    async fn document(&self) -> ProviderResult<SnapshotDocument> {
        match &self.source {
            SnapshotSource::Inline(document) => Ok(document.clone()),
            SnapshotSource::Path(path) => {
                let content =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| ProviderError::Io {
                            source,
                            path: path.clone(),
                        })?;
                serde_json::from_str(&content).map_err(|source| ProviderError::Parse {
                    source,
                    path: path.clone(),
                })
            }
        }
    }
}

#[async_trait]
impl StateProvider for SnapshotFile {
    async fn snapshot(&self) -> ProviderResult<SystemState> {
        Ok(self.document().await?.state)
    }

    async fn valid_channels(&self, category: ChannelCategory) -> ProviderResult<BTreeSet<String>> {
        let document = self.document().await?;
        Ok(match category {
            ChannelCategory::Cable => document.cable_presets,
            ChannelCategory::Satellite => document.satellite_presets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::{DeviceType, Input, Output};
    use chrono::Utc;

    #[tokio::test]
    async fn reads_snapshot_document_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = SystemState::new(Utc::now());
        state.outputs.push(Output::new(1));
        state.inputs.push(Input::new(7, DeviceType::Cable));
        let document = SnapshotDocument {
            state: state.clone(),
            cable_presets: ["206".to_string()].into_iter().collect(),
            satellite_presets: BTreeSet::new(),
        };
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

        let provider = SnapshotFile::open(&path);
        assert_eq!(provider.snapshot().await.unwrap(), state);
        let cable = provider.valid_channels(ChannelCategory::Cable).await.unwrap();
        assert!(cable.contains("206"));
        assert!(provider
            .valid_channels(ChannelCategory::Satellite)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let provider = SnapshotFile::open("/nonexistent/state.json");
        let err = provider.snapshot().await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/state.json"));
    }
}
