use std::collections::{BTreeMap, BTreeSet};

use crate::games::{ChannelRef, PriorityScore};

/// Minimum-coverage rule for a pass. Which branch applies is decided once
/// from the whole candidate set.
#[derive(Debug, Clone, Copy)]
pub(super) struct CoveragePolicy {
    pub total_schedulable: usize,
    pub candidate_count: usize,
    pub any_home_team: bool,
    pub home_team_share: f64,
}

impl CoveragePolicy {
    pub fn min_tvs(&self, score: &PriorityScore) -> usize {
        let total = self.total_schedulable;
        let raw = if score.is_home_team {
            (self.home_team_share * total as f64).ceil() as usize
        } else if !self.any_home_team {
            total.div_ceil(self.candidate_count.max(1))
        } else {
            score.min_tvs_hint().unwrap_or(1)
        };
        raw.max(1).min(total.max(1))
    }
}

/// Pass-scoped bookkeeping: claimed outputs, input usage and occupancy, and
/// which games already sit in each physical group.
#[derive(Debug, Default)]
pub(super) struct PassLedger {
    claimed: BTreeSet<u32>,
    usage: BTreeMap<u32, usize>,
    occupants: BTreeMap<u32, String>,
    channels: BTreeMap<u32, ChannelRef>,
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl PassLedger {
    pub fn is_claimed(&self, output: u32) -> bool {
        self.claimed.contains(&output)
    }

    pub fn usage(&self, input: u32) -> usize {
        self.usage.get(&input).copied().unwrap_or(0)
    }

    pub fn occupant(&self, input: u32) -> Option<&str> {
        self.occupants.get(&input).map(String::as_str)
    }

    pub fn planned_channel(&self, input: u32) -> Option<&ChannelRef> {
        self.channels.get(&input)
    }

    pub fn group_has(&self, group: Option<&str>, game_key: &str) -> bool {
        group
            .and_then(|group| self.groups.get(group))
            .map(|keys| keys.contains(game_key))
            .unwrap_or(false)
    }

    pub fn claim_game(
        &mut self,
        output: u32,
        group: Option<&str>,
        input: u32,
        game_key: &str,
        channel: &ChannelRef,
    ) {
        self.claimed.insert(output);
        *self.usage.entry(input).or_insert(0) += 1;
        self.occupants
            .entry(input)
            .or_insert_with(|| game_key.to_string());
        self.channels.entry(input).or_insert_with(|| channel.clone());
        if let Some(group) = group {
            self.groups
                .entry(group.to_string())
                .or_default()
                .insert(game_key.to_string());
        }
    }

    pub fn claim_default(&mut self, output: u32) {
        self.claimed.insert(output);
    }
}
