use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::StreamingSection;
use crate::games::GameCandidate;

/// Inputs wired to streaming boxes when configuration does not say otherwise.
pub const DEFAULT_STREAMING_INPUTS: [u32; 4] = [13, 14, 15, 16];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PlatformId {
    PrimeVideo,
    Peacock,
    EspnPlus,
    ParamountPlus,
    AppleTv,
    Netflix,
    YoutubeTv,
}

impl PlatformId {
    pub const ALL: [PlatformId; 7] = [
        PlatformId::PrimeVideo,
        PlatformId::Peacock,
        PlatformId::EspnPlus,
        PlatformId::ParamountPlus,
        PlatformId::AppleTv,
        PlatformId::Netflix,
        PlatformId::YoutubeTv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::PrimeVideo => "prime_video",
            PlatformId::Peacock => "peacock",
            PlatformId::EspnPlus => "espn_plus",
            PlatformId::ParamountPlus => "paramount_plus",
            PlatformId::AppleTv => "apple_tv",
            PlatformId::Netflix => "netflix",
            PlatformId::YoutubeTv => "youtube_tv",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformId::ALL
            .into_iter()
            .find(|platform| platform.as_str() == s)
            .ok_or_else(|| format!("unknown streaming platform: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingPlatform {
    pub id: PlatformId,
    pub name: String,
    pub app_id: String,
    pub supports_deep_link: bool,
    pub requires_subscription: bool,
    pub inputs: Vec<u32>,
}

impl StreamingPlatform {
    fn builtin(id: PlatformId) -> Self {
        let (name, app_id, supports_deep_link) = match id {
            PlatformId::PrimeVideo => ("Prime Video", "com.amazon.avod", true),
            PlatformId::Peacock => ("Peacock", "com.peacocktv.peacockandroid", true),
            PlatformId::EspnPlus => ("ESPN+", "com.espn.gtv", true),
            PlatformId::ParamountPlus => ("Paramount+", "com.cbs.ott", true),
            PlatformId::AppleTv => ("Apple TV+", "com.apple.atve.amazon.appletv", false),
            PlatformId::Netflix => ("Netflix", "com.netflix.ninja", false),
            PlatformId::YoutubeTv => ("YouTube TV", "com.amazon.firetv.youtube.tv", true),
        };
        Self {
            id,
            name: name.to_string(),
            app_id: app_id.to_string(),
            supports_deep_link,
            requires_subscription: true,
            inputs: DEFAULT_STREAMING_INPUTS.to_vec(),
        }
    }

    /// Search deep link into the platform app for `candidate`, or `None` when
    /// the app only opens on its home screen.
    pub fn deep_link(&self, candidate: &GameCandidate) -> Option<String> {
        if !self.supports_deep_link {
            return None;
        }
        let (base, param) = match self.id {
            PlatformId::PrimeVideo => ("https://www.amazon.com/gp/video/search", "phrase"),
            PlatformId::Peacock => ("https://www.peacocktv.com/watch/search", "q"),
            PlatformId::EspnPlus => ("https://www.espn.com/watch/search", "q"),
            PlatformId::ParamountPlus => ("https://www.paramountplus.com/search/", "q"),
            PlatformId::YoutubeTv => ("https://tv.youtube.com/search", "q"),
            PlatformId::AppleTv | PlatformId::Netflix => return None,
        };
        let query = format!("{} {}", candidate.away_team.trim(), candidate.home_team.trim());
        Url::parse_with_params(base, &[(param, query.as_str())])
            .ok()
            .map(String::from)
    }
}

/// The platforms the venue can reach, with their wired input pools.
#[derive(Debug, Clone)]
pub struct PlatformCatalog {
    platforms: HashMap<PlatformId, StreamingPlatform>,
}

impl PlatformCatalog {
    pub fn builtin() -> Self {
        Self {
            platforms: PlatformId::ALL
                .into_iter()
                .map(|id| (id, StreamingPlatform::builtin(id)))
                .collect(),
        }
    }

    /// Builtin catalog with per-platform input pools replaced, and disabled
    /// platforms removed, according to configuration.
    pub fn from_config(section: &StreamingSection) -> Self {
        let mut catalog = Self::builtin();
        if let Some(pool) = &section.default_inputs {
            for platform in catalog.platforms.values_mut() {
                platform.inputs = pool.clone();
            }
        }
        for entry in &section.platforms {
            if !entry.enabled {
                catalog.platforms.remove(&entry.id);
                continue;
            }
            if let Some(platform) = catalog.platforms.get_mut(&entry.id) {
                if let Some(inputs) = &entry.inputs {
                    platform.inputs = inputs.clone();
                }
                if let Some(requires_subscription) = entry.requires_subscription {
                    platform.requires_subscription = requires_subscription;
                }
            }
        }
        catalog
    }

    pub fn get(&self, id: PlatformId) -> Option<&StreamingPlatform> {
        self.platforms.get(&id)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformOverride;

    #[test]
    fn deep_link_encodes_teams() {
        let catalog = PlatformCatalog::builtin();
        let prime = catalog.get(PlatformId::PrimeVideo).unwrap();
        let game = GameCandidate::new("Kansas City Chiefs", "Denver Broncos");
        let link = prime.deep_link(&game).unwrap();
        assert!(link.starts_with("https://www.amazon.com/gp/video/search?phrase="));
        assert!(link.contains("Denver+Broncos+Kansas+City+Chiefs"));

        let netflix = catalog.get(PlatformId::Netflix).unwrap();
        assert_eq!(netflix.deep_link(&game), None);
    }

    #[test]
    fn config_overrides_pools_and_disables() {
        let section = StreamingSection {
            default_inputs: Some(vec![20, 21]),
            platforms: vec![
                PlatformOverride {
                    id: PlatformId::Peacock,
                    enabled: true,
                    inputs: Some(vec![22]),
                    requires_subscription: Some(false),
                },
                PlatformOverride {
                    id: PlatformId::Netflix,
                    enabled: false,
                    inputs: None,
                    requires_subscription: None,
                },
            ],
        };
        let catalog = PlatformCatalog::from_config(&section);
        assert_eq!(catalog.get(PlatformId::PrimeVideo).unwrap().inputs, vec![20, 21]);
        let peacock = catalog.get(PlatformId::Peacock).unwrap();
        assert_eq!(peacock.inputs, vec![22]);
        assert!(!peacock.requires_subscription);
        assert!(catalog.get(PlatformId::Netflix).is_none());
        assert_eq!(catalog.len(), PlatformId::ALL.len() - 1);
    }
}
