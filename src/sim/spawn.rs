//! Block spawner
//!
//! Refills the board whenever it empties: one scripted block per tutorial
//! step, or a live batch that grows with score and occasionally carries
//! rare blocks.

use rand::Rng;

use super::block::BlockKind;
use super::state::{GameEvent, SessionState, Stage};
use crate::tuning::Tuning;

/// Fixed tutorial order
pub const TUTORIAL_SCRIPT: [BlockKind; 3] =
    [BlockKind::Tap, BlockKind::SwipeLeft, BlockKind::DoubleTap];

/// Source of spawn randomness
pub trait Roller {
    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool;
    /// Uniform index in `0..len` (`len > 0`)
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> Roller for R {
    fn chance(&mut self, p: f64) -> bool {
        if p.is_nan() {
            return false;
        }
        self.random_bool(p.clamp(0.0, 1.0))
    }

    fn pick(&mut self, len: usize) -> usize {
        self.random_range(0..len.max(1))
    }
}

/// Choose the kind for one live slot. Rare eligibility is judged against
/// `rare_threshold`, the watermark as it stood when the batch started.
pub fn roll_slot<R: Roller + ?Sized>(
    score: u64,
    rare_threshold: u64,
    tuning: &Tuning,
    roller: &mut R,
) -> BlockKind {
    if score >= tuning.rare_min_score && score >= rare_threshold {
        // Extra life is checked first, then coins
        if roller.chance(tuning.extra_life_chance) {
            return BlockKind::ExtraLife;
        }
        if roller.chance(tuning.coins_chance) {
            return BlockKind::Coins;
        }
    }

    let pool = &BlockKind::STANDARD_POOL;
    pool[roller.pick(pool.len()) % pool.len()]
}

/// Refill an empty board. Returns how many blocks were placed; a no-op when
/// blocks remain or the round is over.
pub fn spawn<R: Roller + ?Sized>(
    state: &mut SessionState,
    tuning: &Tuning,
    roller: &mut R,
) -> usize {
    if !state.blocks.is_empty() {
        return 0;
    }

    match state.stage {
        Stage::GameOver => 0,
        Stage::Tutorial { step } => {
            let Some(&kind) = TUTORIAL_SCRIPT.get(step) else {
                log::warn!("Tutorial step {} past end of script", step);
                return 0;
            };
            state.push_block(kind);
            state.events.push(GameEvent::TutorialBlock { step, kind });
            log::debug!("Tutorial step {}: {:?}", step, kind);
            1
        }
        Stage::Live => {
            let size = tuning.batch_size(state.score);
            let threshold = state.next_rare_threshold;
            for _ in 0..size {
                let kind = roll_slot(state.score, threshold, tuning, roller);
                if kind.is_rare() {
                    log::info!("Rare {:?} block at score {}", kind, state.score);
                    state.next_rare_threshold = state
                        .next_rare_threshold
                        .saturating_add(tuning.rare_threshold_increment);
                }
                state.push_block(kind);
            }
            state.round_timer_ms = tuning.round_timer_ms;
            state.batch_size = size;
            state.batch_bonus_awarded = false;
            state.events.push(GameEvent::BatchSpawned { size });
            log::debug!("Batch of {} at score {}", size, state.score);
            size as usize
        }
    }
}
