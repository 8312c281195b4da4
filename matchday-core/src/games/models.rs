use std::fmt;

use serde::{Deserialize, Serialize};

use crate::streaming::PlatformId;
use crate::venue::{DeviceType, Input};

/// One live event the ranking layer wants on screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameCandidate {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cable_channel: Option<String>,
    #[serde(default)]
    pub satellite_channel: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub streaming: Option<StreamingRoute>,
}

impl GameCandidate {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            league: None,
            sport: None,
            description: None,
            cable_channel: None,
            satellite_channel: None,
            channel_name: None,
            streaming: None,
        }
    }

    /// Team-pair key used to identify a game across scores, ledgers and plans.
    pub fn key(&self) -> String {
        format!("{} @ {}", self.away_team.trim(), self.home_team.trim())
    }

    pub fn teams(&self) -> [&str; 2] {
        [self.home_team.as_str(), self.away_team.as_str()]
    }

    /// The channel this game would occupy on `input`, if the candidate carries
    /// usable channel data for that device.
    pub fn channel_for(&self, input: &Input) -> Option<ChannelRef> {
        match input.device_type {
            DeviceType::Cable => non_empty(&self.cable_channel).map(|channel| ChannelRef::Cable {
                channel: channel.to_string(),
            }),
            DeviceType::Satellite => {
                non_empty(&self.satellite_channel).map(|channel| ChannelRef::Satellite {
                    channel: channel.to_string(),
                })
            }
            DeviceType::Streaming => self
                .streaming
                .as_ref()
                .filter(|route| route.input == input.number)
                .map(StreamingRoute::channel),
            DeviceType::Ambient => None,
        }
    }

    pub fn has_broadcast_channel(&self) -> bool {
        non_empty(&self.cable_channel).is_some() || non_empty(&self.satellite_channel).is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|channel| !channel.is_empty())
}

/// Where a streaming-only game can be played, as resolved by the detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingRoute {
    pub platform: PlatformId,
    pub app_id: String,
    pub input: u32,
    #[serde(default)]
    pub deep_link: Option<String>,
}

impl StreamingRoute {
    pub fn channel(&self) -> ChannelRef {
        ChannelRef::Streaming {
            platform: self.platform,
            app_id: self.app_id.clone(),
            deep_link: self.deep_link.clone(),
        }
    }
}

/// What an input is tuned to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelRef {
    Cable {
        channel: String,
    },
    Satellite {
        channel: String,
    },
    Streaming {
        platform: PlatformId,
        app_id: String,
        #[serde(default)]
        deep_link: Option<String>,
    },
}

impl ChannelRef {
    /// Identifier reported by the device while this channel is showing.
    pub fn id(&self) -> &str {
        match self {
            ChannelRef::Cable { channel } | ChannelRef::Satellite { channel } => channel,
            ChannelRef::Streaming { app_id, .. } => app_id,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, ChannelRef::Streaming { .. })
    }

    /// Rebuilds a reference from what an input currently reports.
    pub fn from_current(input: &Input) -> Option<Self> {
        let channel = input.current_channel.as_deref()?.trim();
        if channel.is_empty() {
            return None;
        }
        match input.device_type {
            DeviceType::Cable => Some(ChannelRef::Cable {
                channel: channel.to_string(),
            }),
            DeviceType::Satellite => Some(ChannelRef::Satellite {
                channel: channel.to_string(),
            }),
            DeviceType::Streaming | DeviceType::Ambient => None,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Cable { channel } => write!(f, "cable:{channel}"),
            ChannelRef::Satellite { channel } => write!(f, "satellite:{channel}"),
            ChannelRef::Streaming { platform, .. } => write!(f, "streaming:{platform}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedTeam {
    pub name: String,
    #[serde(default)]
    pub min_tvs: Option<usize>,
    #[serde(default)]
    pub preferred_zones: Vec<String>,
}

/// Ranking oracle verdict for a single candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityScore {
    pub game_key: String,
    pub final_score: f64,
    #[serde(default)]
    pub is_home_team: bool,
    #[serde(default)]
    pub matched_team: Option<MatchedTeam>,
    #[serde(default)]
    pub preferred_zones: Vec<String>,
}

impl PriorityScore {
    pub fn new(game_key: impl Into<String>, final_score: f64) -> Self {
        Self {
            game_key: game_key.into(),
            final_score,
            is_home_team: false,
            matched_team: None,
            preferred_zones: Vec::new(),
        }
    }

    pub fn home_team(mut self) -> Self {
        self.is_home_team = true;
        self
    }

    /// Position of `zone` in the preference list; unlisted zones sort last.
    pub fn zone_rank(&self, zone: Option<&str>) -> usize {
        let Some(zone) = zone else {
            return usize::MAX;
        };
        self.preferred_zones
            .iter()
            .position(|preferred| preferred.eq_ignore_ascii_case(zone))
            .unwrap_or(usize::MAX - 1)
    }

    pub fn min_tvs_hint(&self) -> Option<usize> {
        self.matched_team.as_ref().and_then(|team| team.min_tvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_follows_device_type() {
        let mut game = GameCandidate::new("Packers", "Bears");
        game.cable_channel = Some("206".into());
        game.satellite_channel = Some("  ".into());

        let cable = Input::new(1, DeviceType::Cable);
        let satellite = Input::new(2, DeviceType::Satellite);
        let ambient = Input::new(3, DeviceType::Ambient);
        assert_eq!(
            game.channel_for(&cable),
            Some(ChannelRef::Cable {
                channel: "206".into()
            })
        );
        assert_eq!(game.channel_for(&satellite), None);
        assert_eq!(game.channel_for(&ambient), None);
        assert_eq!(game.key(), "Bears @ Packers");
    }

    #[test]
    fn streaming_channel_only_on_resolved_input() {
        let mut game = GameCandidate::new("Chiefs", "Broncos");
        game.streaming = Some(StreamingRoute {
            platform: PlatformId::PrimeVideo,
            app_id: "com.amazon.avod".into(),
            input: 13,
            deep_link: None,
        });
        assert!(game
            .channel_for(&Input::new(13, DeviceType::Streaming))
            .is_some());
        assert!(game
            .channel_for(&Input::new(14, DeviceType::Streaming))
            .is_none());
    }

    #[test]
    fn zone_rank_orders_listed_zones_first() {
        let mut score = PriorityScore::new("A @ B", 80.0);
        score.preferred_zones = vec!["bar".into(), "main".into()];
        assert_eq!(score.zone_rank(Some("Bar")), 0);
        assert_eq!(score.zone_rank(Some("main")), 1);
        assert!(score.zone_rank(Some("patio")) < score.zone_rank(None));
    }
}
