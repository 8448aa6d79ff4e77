//! Action resolver
//!
//! Decides what a confirmed gesture does to the session. [`resolve`] is pure;
//! the session applies the returned [`Outcome`].

use super::block::{Block, BlockKind};
use super::state::SessionState;
use crate::tuning::Tuning;

/// State change requested by a resolved gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Tutorial block matched: advance the script
    TutorialAdvance,
    /// Standard block solved
    Score {
        points: u64,
        /// Present when this cleared the last standing standard block
        bonus: Option<u64>,
    },
    /// Extra-life block collected
    AwardExtraLife,
    /// Coins block collected
    AwardCoins { amount: u64 },
    /// Avoid block touched: spend a life or lose
    ClaimLife,
}

/// Resolve a confirmed gesture against `block`
pub fn resolve(block: &Block, state: &SessionState, tuning: &Tuning) -> Outcome {
    if state.in_tutorial() {
        return Outcome::TutorialAdvance;
    }

    match block.kind() {
        BlockKind::ExtraLife => Outcome::AwardExtraLife,
        BlockKind::Coins => Outcome::AwardCoins {
            amount: tuning.coin_award,
        },
        BlockKind::Avoid => Outcome::ClaimLife,
        kind => {
            let points = state.scaled_points(kind.base_points(tuning), tuning);
            let others_standing = state
                .blocks
                .iter()
                .any(|b| b.id() != block.id() && b.kind().is_standard() && !b.pending_removal);
            let bonus = if others_standing || state.batch_bonus_awarded {
                None
            } else {
                Some(timer_bonus(state.round_timer_ms, state.batch_size))
            };
            Outcome::Score { points, bonus }
        }
    }
}

/// Bonus for clearing a batch early: remaining seconds times batch size,
/// rounded to the nearest 5
pub fn timer_bonus(remaining_ms: u32, batch_size: u32) -> u64 {
    let raw = f64::from(remaining_ms) / 1000.0 * f64::from(batch_size);
    round_to_nearest_5(raw).max(0) as u64
}

/// Round to the nearest multiple of 5, halves away from zero
pub fn round_to_nearest_5(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    ((value / 5.0).round() * 5.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Stage;
    use proptest::prelude::*;

    fn live(tuning: &Tuning, kinds: &[BlockKind]) -> SessionState {
        let mut state = SessionState::new(tuning);
        state.stage = Stage::Live;
        for &kind in kinds {
            state.push_block(kind);
        }
        state.batch_size = kinds.len() as u32;
        state
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to_nearest_5(0.0), 0);
        assert_eq!(round_to_nearest_5(2.4), 0);
        assert_eq!(round_to_nearest_5(2.5), 5);
        assert_eq!(round_to_nearest_5(7.4), 5);
        assert_eq!(round_to_nearest_5(7.5), 10);
        assert_eq!(round_to_nearest_5(-2.5), -5);
        assert_eq!(round_to_nearest_5(-7.4), -5);
        assert_eq!(round_to_nearest_5(f64::NAN), 0);
    }

    #[test]
    fn test_timer_bonus() {
        // 3.2s left on a batch of 4 -> 12.8 -> 15
        assert_eq!(timer_bonus(3_200, 4), 15);
        assert_eq!(timer_bonus(0, 9), 0);
        assert_eq!(timer_bonus(6_000, 9), 55);
    }

    #[test]
    fn test_tutorial_always_advances() {
        let tuning = Tuning::default();
        let mut state = SessionState::new(&tuning);
        state.push_block(BlockKind::Avoid);
        let block = state.blocks[0].clone();
        assert_eq!(resolve(&block, &state, &tuning), Outcome::TutorialAdvance);
    }

    #[test]
    fn test_standard_points_and_double_score() {
        let tuning = Tuning::default();
        let mut state = live(&tuning, &[BlockKind::Tap, BlockKind::SwipeUp]);
        let block = state.blocks[0].clone();
        assert_eq!(
            resolve(&block, &state, &tuning),
            Outcome::Score { points: 10, bonus: None }
        );
        state.double_score_active = true;
        assert_eq!(
            resolve(&block, &state, &tuning),
            Outcome::Score { points: 20, bonus: None }
        );
    }

    #[test]
    fn test_bonus_only_for_last_standard_block() {
        let tuning = Tuning::default();
        let mut state = live(&tuning, &[BlockKind::Tap, BlockKind::Avoid, BlockKind::Coins]);
        state.round_timer_ms = 4_000;
        let block = state.blocks[0].clone();
        // Specials do not hold back the bonus: 4.0 * 3 = 12 -> 10
        assert_eq!(
            resolve(&block, &state, &tuning),
            Outcome::Score { points: 10, bonus: Some(10) }
        );

        state.batch_bonus_awarded = true;
        assert_eq!(
            resolve(&block, &state, &tuning),
            Outcome::Score { points: 10, bonus: None }
        );
    }

    #[test]
    fn test_special_outcomes() {
        let tuning = Tuning::default();
        let state = live(&tuning, &[BlockKind::ExtraLife, BlockKind::Coins, BlockKind::Avoid]);
        let outcomes: Vec<_> = state
            .blocks
            .iter()
            .map(|b| resolve(b, &state, &tuning))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::AwardExtraLife,
                Outcome::AwardCoins { amount: 15 },
                Outcome::ClaimLife
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_rounding_is_symmetric(v in -10_000.0f64..10_000.0) {
            prop_assert_eq!(round_to_nearest_5(-v), -round_to_nearest_5(v));
            prop_assert_eq!(round_to_nearest_5(v) % 5, 0);
            prop_assert!((round_to_nearest_5(v) as f64 - v).abs() <= 2.5);
        }
    }
}
