use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ActuationSection;
use crate::games::ChannelRef;

#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("controller rejected {command}: status {status}")]
    Rejected { command: String, status: u16 },
    #[error("actuation endpoint not configured")]
    NotConfigured,
    #[error("invalid controller url: {0}")]
    Url(#[from] url::ParseError),
    #[error("device error: {0}")]
    Device(String),
}

pub type ActuationResult<T> = std::result::Result<T, ActuationError>;

/// Write-only hardware layer: tuners and the output matrix.
#[async_trait]
pub trait HardwareActuator: Send + Sync {
    async fn tune(&self, input: u32, channel: &ChannelRef) -> ActuationResult<()>;

    async fn launch_app(
        &self,
        input: u32,
        app_id: &str,
        deep_link: Option<&str>,
    ) -> ActuationResult<()>;

    async fn route(&self, output: u32, input: u32) -> ActuationResult<()>;
}

/// Talks to the venue controller's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpActuator {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpActuator {
    pub fn new(base_url: &str, timeout: Duration) -> ActuationResult<Self> {
        let mut base_url = url::Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(section: &ActuationSection) -> ActuationResult<Self> {
        let base_url = section
            .base_url
            .as_deref()
            .ok_or(ActuationError::NotConfigured)?;
        Self::new(base_url, Duration::from_secs(section.timeout_seconds))
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> ActuationResult<()> {
        let url = self.base_url.join(path)?;
        debug!(target: "actuation", %url, "posting controller command");
        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ActuationError::Rejected {
                command: path.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HardwareActuator for HttpActuator {
    async fn tune(&self, input: u32, channel: &ChannelRef) -> ActuationResult<()> {
        self.post(
            &format!("inputs/{input}/tune"),
            json!({ "channel": channel }),
        )
        .await
    }

    async fn launch_app(
        &self,
        input: u32,
        app_id: &str,
        deep_link: Option<&str>,
    ) -> ActuationResult<()> {
        self.post(
            &format!("inputs/{input}/launch"),
            json!({ "app_id": app_id, "deep_link": deep_link }),
        )
        .await
    }

    async fn route(&self, output: u32, input: u32) -> ActuationResult<()> {
        self.post(&format!("outputs/{output}/route"), json!({ "input": input }))
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ActuationCommand {
    Tune { input: u32, channel: ChannelRef },
    Launch {
        input: u32,
        app_id: String,
        deep_link: Option<String>,
    },
    Route { output: u32, input: u32 },
}

/// Logs and records commands without touching hardware.
#[derive(Debug, Default)]
pub struct DryRunActuator {
    commands: Mutex<Vec<ActuationCommand>>,
}

impl DryRunActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ActuationCommand> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    fn record(&self, command: ActuationCommand) -> ActuationResult<()> {
        info!(target: "actuation", ?command, "dry-run");
        self.commands
            .lock()
            .map_err(|_| ActuationError::Device("dry-run recorder poisoned".into()))?
            .push(command);
        Ok(())
    }
}

#[async_trait]
impl HardwareActuator for DryRunActuator {
    async fn tune(&self, input: u32, channel: &ChannelRef) -> ActuationResult<()> {
        self.record(ActuationCommand::Tune {
            input,
            channel: channel.clone(),
        })
    }

    async fn launch_app(
        &self,
        input: u32,
        app_id: &str,
        deep_link: Option<&str>,
    ) -> ActuationResult<()> {
        self.record(ActuationCommand::Launch {
            input,
            app_id: app_id.to_string(),
            deep_link: deep_link.map(str::to_string),
        })
    }

    async fn route(&self, output: u32, input: u32) -> ActuationResult<()> {
        self.record(ActuationCommand::Route { output, input })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_records_in_order() {
        let actuator = DryRunActuator::new();
        let channel = ChannelRef::Cable {
            channel: "206".into(),
        };
        actuator.tune(4, &channel).await.unwrap();
        actuator.route(1, 4).await.unwrap();
        assert_eq!(
            actuator.commands(),
            vec![
                ActuationCommand::Tune { input: 4, channel },
                ActuationCommand::Route {
                    output: 1,
                    input: 4
                },
            ]
        );
    }

    #[test]
    fn http_actuator_requires_base_url() {
        let section = ActuationSection::default();
        assert!(matches!(
            HttpActuator::from_config(&section),
            Err(ActuationError::NotConfigured)
        ));

        let actuator = HttpActuator::new("http://controller.local:8080/api", Duration::from_secs(2))
            .unwrap();
        assert_eq!(
            actuator.base_url.join("outputs/3/route").unwrap().as_str(),
            "http://controller.local:8080/api/outputs/3/route"
        );
    }
}
