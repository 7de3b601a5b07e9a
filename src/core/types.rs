//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for players
///
/// Computer-controlled opponents are players too, so the same id is used
/// to register an opponent and to find it in a game-state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a personalized decision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeId(pub Uuid);

impl TreeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock timestamp in milliseconds since the unix epoch
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Clamp a score or trait into the unit interval, mapping NaN to 0
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// Fixed seeds so fingerprints are stable across runs of the same build
const FINGERPRINT_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Deterministic 64-bit fingerprint of any hashable value
pub fn fingerprint<T: Hash + ?Sized>(value: &T) -> u64 {
    ahash::RandomState::with_seeds(
        FINGERPRINT_SEEDS[0],
        FINGERPRINT_SEEDS[1],
        FINGERPRINT_SEEDS[2],
        FINGERPRINT_SEEDS[3],
    )
    .hash_one(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_clamps_and_handles_nan() {
        assert_eq!(unit(1.7), 1.0);
        assert_eq!(unit(-0.2), 0.0);
        assert_eq!(unit(f32::NAN), 0.0);
        assert!((unit(0.42) - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn test_player_ids_are_unique() {
        assert_ne!(PlayerId::new(), PlayerId::new());
    }
}
