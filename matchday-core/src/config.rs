use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::streaming::PlatformId;
use crate::venue::{DeviceType, ZoneType};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchdayConfig {
    #[serde(default)]
    pub venue: VenueSection,
    #[serde(default)]
    pub distribution: DistributionSection,
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub streaming: StreamingSection,
    #[serde(default)]
    pub actuation: ActuationSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSection {
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for VenueSection {
    fn default() -> Self {
        Self {
            name: "venue".to_string(),
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistributionSection {
    /// Share of the schedulable estate guaranteed to a home-team game.
    #[serde(default = "default_home_team_share")]
    pub home_team_share: f64,
    /// Scores at or above this must meet their minimum for a plan to validate.
    #[serde(default = "default_high_priority_threshold")]
    pub high_priority_threshold: f64,
    #[serde(default = "default_primary_zone_types")]
    pub primary_zone_types: Vec<ZoneType>,
    #[serde(default = "default_device_preference")]
    pub device_preference: Vec<DeviceType>,
}

impl Default for DistributionSection {
    fn default() -> Self {
        Self {
            home_team_share: default_home_team_share(),
            high_priority_threshold: default_high_priority_threshold(),
            primary_zone_types: default_primary_zone_types(),
            device_preference: default_device_preference(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSection {
    #[serde(default)]
    pub sports_news_input: Option<u32>,
    #[serde(default)]
    pub ambient_input: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamingSection {
    /// Replaces every platform's input pool before per-platform overrides.
    #[serde(default)]
    pub default_inputs: Option<Vec<u32>>,
    #[serde(default)]
    pub platforms: Vec<PlatformOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformOverride {
    pub id: PlatformId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub inputs: Option<Vec<u32>>,
    #[serde(default)]
    pub requires_subscription: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActuationSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ActuationSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_home_team_share() -> f64 {
    0.5
}

fn default_high_priority_threshold() -> f64 {
    90.0
}

fn default_primary_zone_types() -> Vec<ZoneType> {
    vec![ZoneType::Main, ZoneType::Bar, ZoneType::ViewingArea]
}

fn default_device_preference() -> Vec<DeviceType> {
    vec![DeviceType::Satellite, DeviceType::Cable, DeviceType::Streaming]
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    5
}

impl MatchdayConfig {
    fn check(&self) -> std::result::Result<(), String> {
        let share = self.distribution.home_team_share;
        if !(share > 0.0 && share <= 1.0) {
            return Err(format!("home_team_share must be in (0, 1], got {share}"));
        }
        if self.distribution.device_preference.is_empty() {
            return Err("device_preference must list at least one device type".into());
        }
        Ok(())
    }
}

pub fn load_matchday_config<P: AsRef<Path>>(path: P) -> Result<MatchdayConfig> {
    let path = path.as_ref();
    let config: MatchdayConfig = load_toml(path)?;
    config.check().map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/matchday.toml");
        let config = load_matchday_config(path).expect("config should parse");
        assert_eq!(config.venue.name, "Graystone Alehouse");
        assert_eq!(config.distribution.home_team_share, 0.5);
        assert_eq!(config.defaults.sports_news_input, Some(5));
        assert_eq!(config.streaming.platforms[0].id, PlatformId::PrimeVideo);
        assert_eq!(config.actuation.timeout_seconds, 3);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();
        let config = load_matchday_config(&path).unwrap();
        assert_eq!(config.distribution.high_priority_threshold, 90.0);
        assert_eq!(
            config.distribution.device_preference,
            vec![DeviceType::Satellite, DeviceType::Cable, DeviceType::Streaming]
        );
        assert!(config.actuation.base_url.is_none());
    }

    #[test]
    fn rejects_out_of_range_share() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("share.toml");
        std::fs::write(&path, "[distribution]\nhome_team_share = 1.5\n").unwrap();
        let err = load_matchday_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[distribution\nhome_team_share = ").unwrap();
        let err = load_matchday_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
