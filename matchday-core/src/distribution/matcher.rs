//! Strategies deciding whether an input is already showing a candidate game.
//!
//! A false positive pins a TV to the wrong program, so title matching only
//! accepts whole-word team names.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::games::GameCandidate;
use crate::venue::Input;

pub trait ContentMatcher: Send + Sync + fmt::Debug {
    fn is_showing(&self, candidate: &GameCandidate, input: &Input) -> bool;
}

/// Exact match between the input's reported channel and the channel the
/// candidate would occupy on that device.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelIdMatcher;

impl ContentMatcher for ChannelIdMatcher {
    fn is_showing(&self, candidate: &GameCandidate, input: &Input) -> bool {
        let Some(current) = input
            .current_channel
            .as_deref()
            .map(str::trim)
            .filter(|channel| !channel.is_empty())
        else {
            return false;
        };
        candidate
            .channel_for(input)
            .map(|channel| channel.id().eq_ignore_ascii_case(current))
            .unwrap_or(false)
    }
}

/// Matches the program title against team names on whole words.
///
/// A full team name must appear as a contiguous run of words, or the team's
/// nickname (its last word) must appear on its own provided it is long enough
/// and not a stop word. "City" or "United" alone never match.
#[derive(Debug, Clone)]
pub struct TeamNameMatcher {
    stop_words: HashSet<String>,
    min_nickname_len: usize,
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "city", "united", "fc", "sc", "cf", "ac", "state", "new", "york", "los", "angeles",
    "san", "st", "saint", "real", "club", "athletic", "athletics", "sporting", "team", "game",
    "live", "football", "basketball", "baseball", "hockey", "soccer", "sports", "news", "red",
    "white", "blue", "north", "south", "east", "west", "university", "college",
];

impl Default for TeamNameMatcher {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|word| word.to_string()).collect(),
            min_nickname_len: 4,
        }
    }
}

impl TeamNameMatcher {
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|word| word.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_min_nickname_len(mut self, len: usize) -> Self {
        self.min_nickname_len = len;
        self
    }

    fn team_in(&self, team: &str, show: &[String]) -> bool {
        let team_words = words(team);
        if team_words.is_empty() {
            return false;
        }
        if show
            .windows(team_words.len())
            .any(|window| window == team_words.as_slice())
        {
            return true;
        }
        if team_words.len() < 2 {
            return false;
        }
        let nickname = &team_words[team_words.len() - 1];
        nickname.chars().count() >= self.min_nickname_len
            && !self.stop_words.contains(nickname)
            && show.iter().any(|word| word == nickname)
    }
}

impl ContentMatcher for TeamNameMatcher {
    fn is_showing(&self, candidate: &GameCandidate, input: &Input) -> bool {
        let Some(show) = input.current_show.as_deref() else {
            return false;
        };
        let show = words(show);
        if show.is_empty() {
            return false;
        }
        candidate.teams().iter().any(|team| self.team_in(team, &show))
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// First matcher that says yes wins.
#[derive(Debug, Clone)]
pub struct ChainedMatcher {
    matchers: Vec<Arc<dyn ContentMatcher>>,
}

impl ChainedMatcher {
    pub fn new(matchers: Vec<Arc<dyn ContentMatcher>>) -> Self {
        Self { matchers }
    }
}

impl ContentMatcher for ChainedMatcher {
    fn is_showing(&self, candidate: &GameCandidate, input: &Input) -> bool {
        self.matchers
            .iter()
            .any(|matcher| matcher.is_showing(candidate, input))
    }
}

/// Channel id first, then conservative title matching.
pub fn default_matcher() -> Arc<dyn ContentMatcher> {
    Arc::new(ChainedMatcher::new(vec![
        Arc::new(ChannelIdMatcher),
        Arc::new(TeamNameMatcher::default()),
    ]))
}
