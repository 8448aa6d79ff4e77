//! Block kinds and the per-kind rule table
//!
//! Spawner, expiry engine and resolver all consult `BlockKind` methods
//! instead of branching on kinds ad hoc.

use serde::{Deserialize, Serialize};

use super::gesture::Gesture;
use crate::tuning::Tuning;

/// Block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    Tap,
    DoubleTap,
    /// Must not be touched; expiring untouched is the win condition
    Avoid,
    /// Rare: grants one extra life
    ExtraLife,
    /// Rare: grants coins
    Coins,
}

impl BlockKind {
    /// Kinds a regular live slot picks from uniformly
    pub const STANDARD_POOL: [BlockKind; 7] = [
        BlockKind::SwipeLeft,
        BlockKind::SwipeRight,
        BlockKind::SwipeUp,
        BlockKind::SwipeDown,
        BlockKind::Tap,
        BlockKind::DoubleTap,
        BlockKind::Avoid,
    ];

    /// Gesture blocks whose expiry ends the round
    pub fn is_standard(self) -> bool {
        !self.is_special()
    }

    /// Short-lived blocks whose expiry is harmless
    pub fn is_special(self) -> bool {
        matches!(self, BlockKind::Avoid | BlockKind::ExtraLife | BlockKind::Coins)
    }

    /// Gated by score watermark and a low-probability roll
    pub fn is_rare(self) -> bool {
        matches!(self, BlockKind::ExtraLife | BlockKind::Coins)
    }

    /// Gesture that solves this block (None for avoid)
    pub fn required_gesture(self) -> Option<Gesture> {
        match self {
            BlockKind::SwipeLeft => Some(Gesture::SwipeLeft),
            BlockKind::SwipeRight => Some(Gesture::SwipeRight),
            BlockKind::SwipeUp => Some(Gesture::SwipeUp),
            BlockKind::SwipeDown => Some(Gesture::SwipeDown),
            BlockKind::Tap | BlockKind::ExtraLife | BlockKind::Coins => Some(Gesture::Tap),
            BlockKind::DoubleTap => Some(Gesture::DoubleTap),
            BlockKind::Avoid => None,
        }
    }

    /// Age at which the block expires (ms)
    pub fn lifetime_ms(self, tuning: &Tuning, score: u64) -> u32 {
        if self.is_special() {
            tuning.special_lifetime_ms
        } else {
            tuning.standard_lifetime(score)
        }
    }

    /// Points for solving the block, before the double-score multiplier
    pub fn base_points(self, tuning: &Tuning) -> u64 {
        if self.is_standard() {
            tuning.base_score
        } else {
            0
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::SwipeLeft => "swipeLeft",
            BlockKind::SwipeRight => "swipeRight",
            BlockKind::SwipeUp => "swipeUp",
            BlockKind::SwipeDown => "swipeDown",
            BlockKind::Tap => "tap",
            BlockKind::DoubleTap => "doubleTap",
            BlockKind::Avoid => "avoid",
            BlockKind::ExtraLife => "extraLife",
            BlockKind::Coins => "coins",
        }
    }
}

/// Opaque one-shot block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single active target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    /// Session clock at spawn (ms)
    created_at: u64,
    /// Accepted gesture waiting on its removal to settle
    #[serde(default)]
    pub pending_removal: bool,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind, created_at: u64) -> Self {
        Self {
            id,
            kind,
            created_at,
            pending_removal: false,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Age relative to the session clock
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// True once the block has outlived its kind's lifetime
    pub fn is_expired(&self, now: u64, tuning: &Tuning, score: u64) -> bool {
        self.age_ms(now) >= u64::from(self.kind.lifetime_ms(tuning, score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_partitions() {
        for kind in BlockKind::STANDARD_POOL {
            assert!(!kind.is_rare());
        }
        assert!(BlockKind::Avoid.is_special());
        assert!(!BlockKind::Avoid.is_rare());
        assert!(BlockKind::Coins.is_rare() && BlockKind::Coins.is_special());
        assert!(BlockKind::DoubleTap.is_standard());
        assert_eq!(BlockKind::Avoid.required_gesture(), None);
        assert_eq!(BlockKind::ExtraLife.required_gesture(), Some(Gesture::Tap));
    }

    #[test]
    fn test_lifetimes() {
        let tuning = Tuning::default();
        assert_eq!(BlockKind::Tap.lifetime_ms(&tuning, 0), 5_500);
        assert_eq!(BlockKind::SwipeUp.lifetime_ms(&tuning, 500), 5_000);
        assert_eq!(BlockKind::Avoid.lifetime_ms(&tuning, 0), 2_500);
        assert_eq!(BlockKind::Coins.lifetime_ms(&tuning, 900), 2_500);
    }

    #[test]
    fn test_block_expiry_boundary() {
        let tuning = Tuning::default();
        let block = Block::new(BlockId(1), BlockKind::Tap, 1_000);
        assert!(!block.is_expired(6_499, &tuning, 0));
        assert!(block.is_expired(6_500, &tuning, 0));
        assert_eq!(block.age_ms(500), 0);
    }
}
