//! Round timer and expiry engine
//!
//! One fixed-period step of a live round: count the round timer down, age
//! blocks, drop expired specials and decide whether expired standard
//! blocks can be absorbed by extra lives.

use super::block::BlockKind;
use super::state::{GameEvent, SessionState, Stage};
use crate::consts::TICK_MS;
use crate::tuning::Tuning;

/// Verdict on expired standard blocks after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Nothing fatal expired
    Quiet,
    /// Enough lives to cover every expiring standard block
    Rescue { needed: u32 },
    /// Round lost
    Fatal,
}

/// Advance a live round by one tick. Does nothing outside `Live` or while
/// frozen.
pub fn advance(state: &mut SessionState, tuning: &Tuning) -> Expiry {
    if state.stage != Stage::Live || state.freeze.is_some() {
        return Expiry::Quiet;
    }

    state.clock_ms += TICK_MS;
    state.round_timer_ms = state.round_timer_ms.saturating_sub(TICK_MS as u32);

    let now = state.clock_ms;
    let score = state.score;

    // Specials expire quietly; an untouched avoid block pays out
    let expired_specials: Vec<_> = state
        .blocks
        .iter()
        .filter(|b| b.kind().is_special() && !b.pending_removal && b.is_expired(now, tuning, score))
        .map(|b| (b.id(), b.kind()))
        .collect();
    for (id, kind) in expired_specials {
        state.remove_block(id);
        if kind == BlockKind::Avoid {
            let points = state.scaled_points(tuning.avoid_reward, tuning);
            state.score += points;
            state.events.push(GameEvent::AvoidDodged { id, points });
        } else {
            state.events.push(GameEvent::Expired { id, kind });
        }
    }

    let timer_out = state.round_timer_ms == 0;
    let expiring = state
        .blocks
        .iter()
        .filter(|b| b.kind().is_standard() && !b.pending_removal)
        .filter(|b| timer_out || b.is_expired(now, tuning, score))
        .count() as u32;

    if expiring == 0 {
        Expiry::Quiet
    } else if state.extra_lives >= expiring {
        // Life sufficiency is checked before fatality
        log::info!("{} block(s) timed out, {} extra lives available", expiring, state.extra_lives);
        Expiry::Rescue { needed: expiring }
    } else {
        log::info!("{} block(s) timed out with {} extra lives", expiring, state.extra_lives);
        Expiry::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(kinds: &[BlockKind]) -> (SessionState, Tuning) {
        let tuning = Tuning::default();
        let mut state = SessionState::new(&tuning);
        state.stage = Stage::Live;
        for &kind in kinds {
            state.push_block(kind);
        }
        (state, tuning)
    }

    fn run(state: &mut SessionState, tuning: &Tuning, ticks: u32) -> Expiry {
        let mut last = Expiry::Quiet;
        for _ in 0..ticks {
            last = advance(state, tuning);
            if last != Expiry::Quiet {
                break;
            }
        }
        last
    }

    #[test]
    fn test_standard_block_expires_at_limit() {
        let (mut state, tuning) = live(&[BlockKind::Tap]);
        assert_eq!(run(&mut state, &tuning, 54), Expiry::Quiet);
        assert_eq!(advance(&mut state, &tuning), Expiry::Fatal);
        assert_eq!(state.clock_ms, 5_500);
    }

    #[test]
    fn test_late_game_expires_sooner() {
        let (mut state, tuning) = live(&[BlockKind::SwipeDown]);
        state.score = 500;
        assert_eq!(run(&mut state, &tuning, 49), Expiry::Quiet);
        assert_eq!(advance(&mut state, &tuning), Expiry::Fatal);
    }

    #[test]
    fn test_lives_cover_simultaneous_expiry() {
        let (mut state, tuning) = live(&[BlockKind::Tap, BlockKind::SwipeLeft]);
        state.extra_lives = 2;
        assert_eq!(run(&mut state, &tuning, 55), Expiry::Rescue { needed: 2 });

        let (mut state, tuning) = live(&[BlockKind::Tap, BlockKind::SwipeLeft]);
        state.extra_lives = 1;
        assert_eq!(run(&mut state, &tuning, 55), Expiry::Fatal);
    }

    #[test]
    fn test_specials_expire_quietly_and_avoid_pays() {
        let (mut state, tuning) = live(&[BlockKind::Avoid, BlockKind::Coins, BlockKind::Tap]);
        assert_eq!(run(&mut state, &tuning, 25), Expiry::Quiet);
        assert_eq!(state.blocks.len(), 1);
        assert_eq!(state.blocks[0].kind(), BlockKind::Tap);
        assert_eq!(state.score, tuning.avoid_reward);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::AvoidDodged { .. })));
        assert!(state
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::Expired { kind: BlockKind::Coins, .. })));
    }

    #[test]
    fn test_round_timer_floors_at_zero_and_forces_expiry() {
        let (mut state, tuning) = live(&[BlockKind::Tap]);
        state.round_timer_ms = 150;
        assert_eq!(advance(&mut state, &tuning), Expiry::Quiet);
        assert_eq!(state.round_timer_ms, 50);
        assert_eq!(advance(&mut state, &tuning), Expiry::Fatal);
        assert_eq!(state.round_timer_ms, 0);
    }

    #[test]
    fn test_paused_outside_live() {
        let (mut state, tuning) = live(&[BlockKind::Tap]);
        state.stage = Stage::Tutorial { step: 0 };
        assert_eq!(run(&mut state, &tuning, 200), Expiry::Quiet);
        assert_eq!(state.clock_ms, 0);
        assert_eq!(state.round_timer_ms, tuning.round_timer_ms);
    }
}
