use regex::Regex;

use super::platforms::PlatformId;
use crate::games::GameCandidate;

/// A single classification rule. Every pattern that is set must match its
/// field (case-insensitive); an absent field never matches a set pattern.
#[derive(Debug, Clone)]
pub struct PlatformRule {
    pub platform: PlatformId,
    pub league: Option<Regex>,
    pub sport: Option<Regex>,
    pub channel: Option<Regex>,
    pub description: Option<Regex>,
}

impl PlatformRule {
    pub fn new(platform: PlatformId) -> Self {
        Self {
            platform,
            league: None,
            sport: None,
            channel: None,
            description: None,
        }
    }

    pub fn league(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.league = Some(insensitive(pattern)?);
        Ok(self)
    }

    pub fn sport(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.sport = Some(insensitive(pattern)?);
        Ok(self)
    }

    pub fn channel(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.channel = Some(insensitive(pattern)?);
        Ok(self)
    }

    pub fn description(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.description = Some(insensitive(pattern)?);
        Ok(self)
    }

    pub fn matches(&self, candidate: &GameCandidate) -> bool {
        field_matches(&self.league, candidate.league.as_deref())
            && field_matches(&self.sport, candidate.sport.as_deref())
            && field_matches(&self.channel, candidate.channel_name.as_deref())
            && field_matches(&self.description, candidate.description.as_deref())
    }
}

fn insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){pattern}"))
}

fn field_matches(pattern: &Option<Regex>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(pattern), Some(value)) => pattern.is_match(value),
        (Some(_), None) => false,
    }
}

/// Rules in evaluation order; the first match wins.
pub fn default_rules() -> Result<Vec<PlatformRule>, regex::Error> {
    Ok(vec![
        PlatformRule::new(PlatformId::PrimeVideo)
            .league(r"^(nfl|national football league)$")?
            .description(r"thursday\s+night")?,
        PlatformRule::new(PlatformId::PrimeVideo).channel(r"prime\s*video|amazon")?,
        PlatformRule::new(PlatformId::Netflix).channel(r"netflix")?,
        PlatformRule::new(PlatformId::AppleTv).channel(r"apple\s*tv")?,
        PlatformRule::new(PlatformId::AppleTv)
            .league(r"^(mls|major league soccer)$")?
            .description(r"season\s+pass")?,
        PlatformRule::new(PlatformId::AppleTv)
            .league(r"^(mlb|major league baseball)$")?
            .description(r"friday\s+night\s+baseball")?,
        PlatformRule::new(PlatformId::Peacock).channel(r"peacock")?,
        PlatformRule::new(PlatformId::ParamountPlus).channel(r"paramount\s*(\+|plus)")?,
        PlatformRule::new(PlatformId::EspnPlus).channel(r"espn\s*(\+|plus)")?,
        PlatformRule::new(PlatformId::YoutubeTv).channel(r"sunday\s+ticket|youtube")?,
    ])
}

pub fn classify(rules: &[PlatformRule], candidate: &GameCandidate) -> Option<PlatformId> {
    rules
        .iter()
        .find(|rule| rule.matches(candidate))
        .map(|rule| rule.platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(league: &str, channel: Option<&str>, description: Option<&str>) -> GameCandidate {
        let mut game = GameCandidate::new("Home", "Away");
        game.league = Some(league.into());
        game.channel_name = channel.map(Into::into);
        game.description = description.map(Into::into);
        game
    }

    #[test]
    fn thursday_night_football_goes_to_prime() {
        let rules = default_rules().unwrap();
        let tnf = game("NFL", None, Some("Thursday Night Football"));
        assert_eq!(classify(&rules, &tnf), Some(PlatformId::PrimeVideo));

        let sunday = game("NFL", Some("FOX"), Some("Sunday afternoon"));
        assert_eq!(classify(&rules, &sunday), None);
    }

    #[test]
    fn espn_plus_is_not_plain_espn() {
        let rules = default_rules().unwrap();
        assert_eq!(
            classify(&rules, &game("NHL", Some("ESPN+"), None)),
            Some(PlatformId::EspnPlus)
        );
        assert_eq!(classify(&rules, &game("NBA", Some("ESPN"), None)), None);
    }

    #[test]
    fn description_rules_need_league() {
        let rules = default_rules().unwrap();
        let mls = game("MLS", None, Some("MLS Season Pass exclusive"));
        assert_eq!(classify(&rules, &mls), Some(PlatformId::AppleTv));

        let mut no_league = GameCandidate::new("Home", "Away");
        no_league.description = Some("MLS Season Pass exclusive".into());
        assert_eq!(classify(&rules, &no_league), None);
    }
}
