use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::platforms::{PlatformCatalog, PlatformId, StreamingPlatform};
use super::rules::{classify, default_rules, PlatformRule};
use crate::actuation::{ActuationResult, HardwareActuator};
use crate::games::{GameCandidate, StreamingRoute};

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("device registry error: {0}")]
    Registry(String),
    #[error("failed to read device list {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse device list {path}: {source}")]
    Parse {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("invalid platform rule: {0}")]
    Rule(#[from] regex::Error),
}

pub type StreamingResult<T> = std::result::Result<T, StreamingError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingDevice {
    pub device_id: String,
    pub input_number: u32,
    #[serde(default)]
    pub label: Option<String>,
    pub online: bool,
}

/// Which streaming boxes exist and whether they answer right now.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn online_devices(&self) -> StreamingResult<Vec<StreamingDevice>>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticDeviceRegistry {
    devices: Vec<StreamingDevice>,
}

impl StaticDeviceRegistry {
    pub fn new(devices: Vec<StreamingDevice>) -> Self {
        Self { devices }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> StreamingResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| StreamingError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        let devices = serde_json::from_str(&content).map_err(|source| StreamingError::Parse {
            source,
            path: path.to_path_buf(),
        })?;
        Ok(Self { devices })
    }
}

#[async_trait]
impl DeviceRegistry for StaticDeviceRegistry {
    async fn online_devices(&self) -> StreamingResult<Vec<StreamingDevice>> {
        Ok(self
            .devices
            .iter()
            .filter(|device| device.online)
            .cloned()
            .collect())
    }
}

/// A game matched to a streaming platform and a concrete input that can play it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingCandidate {
    pub candidate: GameCandidate,
    pub platform: PlatformId,
    pub app_id: String,
    pub deep_link: Option<String>,
    pub requires_subscription: bool,
    pub input_number: u32,
}

impl StreamingCandidate {
    pub fn route(&self) -> StreamingRoute {
        StreamingRoute {
            platform: self.platform,
            app_id: self.app_id.clone(),
            input: self.input_number,
            deep_link: self.deep_link.clone(),
        }
    }

    /// The candidate as the distribution engine consumes it.
    pub fn into_candidate(self) -> GameCandidate {
        let route = self.route();
        let mut candidate = self.candidate;
        candidate.streaming = Some(route);
        candidate
    }
}

pub struct StreamingDetector {
    catalog: PlatformCatalog,
    rules: Vec<PlatformRule>,
    registry: Arc<dyn DeviceRegistry>,
}

impl std::fmt::Debug for StreamingDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingDetector")
            .field("catalog", &self.catalog)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl StreamingDetector {
    pub fn new(catalog: PlatformCatalog, registry: Arc<dyn DeviceRegistry>) -> StreamingResult<Self> {
        Ok(Self {
            catalog,
            rules: default_rules()?,
            registry,
        })
    }

    pub fn with_rules(mut self, rules: Vec<PlatformRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn classify(&self, candidate: &GameCandidate) -> Option<&StreamingPlatform> {
        let platform = classify(&self.rules, candidate)?;
        self.catalog.get(platform)
    }

    pub async fn detect(
        &self,
        candidates: &[GameCandidate],
    ) -> StreamingResult<Vec<StreamingCandidate>> {
        let online: BTreeSet<u32> = self
            .registry
            .online_devices()
            .await?
            .into_iter()
            .filter(|device| device.online)
            .map(|device| device.input_number)
            .collect();

        let mut detected = Vec::new();
        for candidate in candidates {
            let Some(platform) = self.classify(candidate) else {
                continue;
            };
            let Some(input_number) = platform
                .inputs
                .iter()
                .copied()
                .find(|input| online.contains(input))
            else {
                warn!(
                    target: "streaming",
                    game = %candidate.key(),
                    platform = %platform.id,
                    pool = ?platform.inputs,
                    "no online input for streaming platform, skipping game"
                );
                continue;
            };
            debug!(
                target: "streaming",
                game = %candidate.key(),
                platform = %platform.id,
                input = input_number,
                "streaming match"
            );
            detected.push(StreamingCandidate {
                candidate: candidate.clone(),
                platform: platform.id,
                app_id: platform.app_id.clone(),
                deep_link: platform.deep_link(candidate),
                requires_subscription: platform.requires_subscription,
                input_number,
            });
        }

        info!(
            target: "streaming",
            candidates = candidates.len(),
            detected = detected.len(),
            "streaming detection finished"
        );
        Ok(detected)
    }

    /// Opens the platform app on the resolved input. Without a deep link the
    /// app lands on its home screen.
    pub async fn launch(
        &self,
        actuator: &dyn HardwareActuator,
        candidate: &StreamingCandidate,
    ) -> ActuationResult<()> {
        info!(
            target: "streaming",
            game = %candidate.candidate.key(),
            platform = %candidate.platform,
            input = candidate.input_number,
            deep_link = candidate.deep_link.is_some(),
            "launching streaming app"
        );
        actuator
            .launch_app(
                candidate.input_number,
                &candidate.app_id,
                candidate.deep_link.as_deref(),
            )
            .await
    }
}

/// Replaces candidates the detector matched with their streaming-routed form
/// and keeps the rest untouched, preserving order.
pub fn merge_streaming(
    candidates: Vec<GameCandidate>,
    detected: Vec<StreamingCandidate>,
) -> Vec<GameCandidate> {
    let mut routed: Vec<(String, GameCandidate)> = detected
        .into_iter()
        .map(|streaming| (streaming.candidate.key(), streaming.into_candidate()))
        .collect();
    candidates
        .into_iter()
        .map(|candidate| {
            let key = candidate.key();
            match routed.iter().position(|(routed_key, _)| *routed_key == key) {
                Some(index) => routed.swap_remove(index).1,
                None => candidate,
            }
        })
        .collect()
}
