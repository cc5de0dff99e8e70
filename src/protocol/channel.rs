//! Channel names, frame sides and handshake readiness tracking

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// The logical channels multiplexed between host and frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelName {
    /// Gestures, link and decoration activation, content size
    Area,
    /// Selection requests and replies
    Selection,
    /// Decoration commands
    Decorations,
}

impl ChannelName {
    pub const ALL: [ChannelName; 3] = [
        ChannelName::Area,
        ChannelName::Selection,
        ChannelName::Decorations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelName::Area => "area",
            ChannelName::Selection => "selection",
            ChannelName::Decorations => "decorations",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownChannel(s.to_string()))
    }
}

/// Which frame of the layout a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSide {
    /// The only frame of a single-page layout
    Single,
    Left,
    Right,
}

impl fmt::Display for FrameSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameSide::Single => "single",
            FrameSide::Left => "left",
            FrameSide::Right => "right",
        })
    }
}

/// What a handshake did to the readiness state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// From another load cycle or an unexpected side
    Stale,
    /// Side already completed this channel in the current cycle
    Duplicate,
    /// Recorded, still waiting on other sides
    Pending { remaining: usize },
    /// Recorded, and the channel is now available
    Available,
}

impl HandshakeOutcome {
    /// Whether the endpoint carried by the handshake should be bound
    pub fn accepted(&self) -> bool {
        matches!(self, HandshakeOutcome::Pending { .. } | HandshakeOutcome::Available)
    }
}

/// Per-channel readiness counters for one load cycle
///
/// Each channel starts the cycle with a counter equal to the number of
/// expected sides; every accepted handshake decrements it and the channel
/// becomes available at zero. There is no timeout: a side that never
/// completes keeps its channel unavailable until the next cycle.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    cycle: u64,
    expected: BTreeSet<FrameSide>,
    completed: BTreeMap<ChannelName, BTreeSet<FrameSide>>,
    available: BTreeSet<ChannelName>,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle expecting `sides`; returns the new cycle token
    pub fn reset(&mut self, sides: impl IntoIterator<Item = FrameSide>) -> u64 {
        self.cycle += 1;
        self.expected = sides.into_iter().collect();
        self.completed.clear();
        self.available.clear();
        self.cycle
    }

    /// Record a channel-open request
    pub fn record(&mut self, cycle: u64, side: FrameSide, channel: ChannelName) -> HandshakeOutcome {
        if cycle != self.cycle || !self.expected.contains(&side) {
            return HandshakeOutcome::Stale;
        }

        let completed = self.completed.entry(channel).or_default();
        if !completed.insert(side) {
            return HandshakeOutcome::Duplicate;
        }

        let remaining = self.expected.len() - completed.len();
        if remaining == 0 {
            self.available.insert(channel);
            HandshakeOutcome::Available
        } else {
            HandshakeOutcome::Pending { remaining }
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn is_available(&self, channel: ChannelName) -> bool {
        self.available.contains(&channel)
    }

    /// Sides still expected to open `channel`
    pub fn remaining(&self, channel: ChannelName) -> usize {
        let done = self.completed.get(&channel).map_or(0, BTreeSet::len);
        self.expected.len() - done
    }

    pub fn expected(&self) -> impl Iterator<Item = FrameSide> + '_ {
        self.expected.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_round_trip() {
        for channel in ChannelName::ALL {
            assert_eq!(channel.as_str().parse::<ChannelName>().unwrap(), channel);
            assert_eq!(
                serde_json::to_value(channel).unwrap(),
                serde_json::json!(channel.as_str())
            );
        }
        assert!("gestures".parse::<ChannelName>().is_err());
    }

    #[test]
    fn test_both_sides_required_in_any_order() {
        for order in [[FrameSide::Left, FrameSide::Right], [FrameSide::Right, FrameSide::Left]] {
            let mut tracker = ReadinessTracker::new();
            let cycle = tracker.reset([FrameSide::Left, FrameSide::Right]);

            assert_eq!(
                tracker.record(cycle, order[0], ChannelName::Decorations),
                HandshakeOutcome::Pending { remaining: 1 }
            );
            assert!(!tracker.is_available(ChannelName::Decorations));
            assert_eq!(
                tracker.record(cycle, order[1], ChannelName::Decorations),
                HandshakeOutcome::Available
            );
            assert!(tracker.is_available(ChannelName::Decorations));
            assert!(!tracker.is_available(ChannelName::Selection));
        }
    }

    #[test]
    fn test_single_side_spread_is_not_blocked_by_absent_side() {
        let mut tracker = ReadinessTracker::new();
        let cycle = tracker.reset([FrameSide::Left]);

        assert_eq!(
            tracker.record(cycle, FrameSide::Left, ChannelName::Decorations),
            HandshakeOutcome::Available
        );
        assert_eq!(
            tracker.record(cycle, FrameSide::Right, ChannelName::Decorations),
            HandshakeOutcome::Stale
        );
    }

    #[test]
    fn test_duplicate_and_stale_handshakes_ignored() {
        let mut tracker = ReadinessTracker::new();
        let old = tracker.reset([FrameSide::Left, FrameSide::Right]);
        let cycle = tracker.reset([FrameSide::Left, FrameSide::Right]);

        assert_eq!(
            tracker.record(old, FrameSide::Left, ChannelName::Area),
            HandshakeOutcome::Stale
        );
        assert_eq!(tracker.remaining(ChannelName::Area), 2);

        assert!(tracker.record(cycle, FrameSide::Left, ChannelName::Area).accepted());
        assert_eq!(
            tracker.record(cycle, FrameSide::Left, ChannelName::Area),
            HandshakeOutcome::Duplicate
        );
        assert_eq!(tracker.remaining(ChannelName::Area), 1);
    }

    #[test]
    fn test_reset_clears_availability() {
        let mut tracker = ReadinessTracker::new();
        let cycle = tracker.reset([FrameSide::Single]);
        tracker.record(cycle, FrameSide::Single, ChannelName::Selection);
        assert!(tracker.is_available(ChannelName::Selection));

        tracker.reset([FrameSide::Single]);
        assert!(!tracker.is_available(ChannelName::Selection));
    }
}
