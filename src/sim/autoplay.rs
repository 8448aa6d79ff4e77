//! Demo autoplay
//!
//! A simple bot that plays the round through the same pointer commands a
//! player would use. It waits a reaction delay, favors rare blocks, then
//! the oldest block, never touches avoid blocks on purpose, and
//! occasionally blunders.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::block::{BlockId, BlockKind};
use super::gesture::PointerSample;
use super::session::PointerAction;
use super::state::{GamePhase, SessionState};

/// Board center the bot gestures from (px)
const ORIGIN: (f32, f32) = (200.0, 200.0);
/// Swipe travel (px)
const SWIPE_PX: f32 = 80.0;
/// Press duration (ms)
const PRESS_MS: u64 = 40;
/// Gap between the presses of a double tap (ms)
const TAP_GAP_MS: u64 = 60;

/// Pointer actions that perform the gesture for `kind` on block `id`,
/// starting at pointer time `at_ms`
pub fn gesture_actions(id: BlockId, kind: BlockKind, at_ms: u64) -> Vec<PointerAction> {
    let (dx, dy) = match kind {
        BlockKind::SwipeLeft => (-SWIPE_PX, 0.0),
        BlockKind::SwipeRight => (SWIPE_PX, 0.0),
        BlockKind::SwipeUp => (0.0, -SWIPE_PX),
        BlockKind::SwipeDown => (0.0, SWIPE_PX),
        _ => (0.0, 0.0),
    };
    let presses = if kind == BlockKind::DoubleTap { 2 } else { 1 };

    let mut actions = Vec::with_capacity(presses * 2);
    let mut t = at_ms;
    for _ in 0..presses {
        actions.push(PointerAction::Start(PointerSample::new(ORIGIN.0, ORIGIN.1, t)));
        t += PRESS_MS;
        actions.push(PointerAction::End(
            PointerSample::new(ORIGIN.0 + dx, ORIGIN.1 + dy, t),
            id,
        ));
        t += TAP_GAP_MS;
    }
    actions
}

pub struct Autoplay {
    rng: Pcg32,
    /// Minimum block age before the bot reacts (ms)
    reaction_ms: u64,
    /// Per-decision chance of hesitating or touching an avoid block
    blunder_chance: f64,
    pointer_ms: u64,
}

impl Autoplay {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            reaction_ms: 600,
            blunder_chance: 0.02,
            pointer_ms: 0,
        }
    }

    pub fn with_skill(mut self, reaction_ms: u64, blunder_chance: f64) -> Self {
        self.reaction_ms = reaction_ms;
        self.blunder_chance = if blunder_chance.is_nan() {
            0.0
        } else {
            blunder_chance.clamp(0.0, 1.0)
        };
        self
    }

    /// Decide this tick's input. At most one block is acted on per call.
    pub fn plan(&mut self, state: &SessionState) -> Vec<PointerAction> {
        let live = match state.phase() {
            GamePhase::Live => true,
            GamePhase::Tutorial => false,
            _ => return Vec::new(),
        };
        let now = state.clock_ms;
        let reaction_ms = self.reaction_ms;

        let target = state
            .blocks
            .iter()
            .filter(|b| !b.pending_removal && b.kind() != BlockKind::Avoid)
            .filter(|b| !live || b.age_ms(now) >= reaction_ms)
            .max_by_key(|b| (b.kind().is_rare(), b.age_ms(now), std::cmp::Reverse(b.id())));
        let Some(target) = target else {
            return Vec::new();
        };
        let (id, kind) = (target.id(), target.kind());

        if live && self.rng.random_bool(self.blunder_chance) {
            let avoid = state
                .blocks
                .iter()
                .find(|b| b.kind() == BlockKind::Avoid && !b.pending_removal);
            return match avoid {
                Some(avoid) => {
                    log::debug!("Autoplay blunders into {}", avoid.id());
                    self.perform(avoid.id(), BlockKind::Tap, now)
                }
                None => Vec::new(),
            };
        }

        self.perform(id, kind, now)
    }

    fn perform(&mut self, id: BlockId, kind: BlockKind, now: u64) -> Vec<PointerAction> {
        self.pointer_ms = self.pointer_ms.max(now) + TAP_GAP_MS;
        let actions = gesture_actions(id, kind, self.pointer_ms);
        if let Some(PointerAction::End(last, _)) = actions.last() {
            self.pointer_ms = last.at_ms;
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::session::Session;
    use crate::sim::state::Stage;
    use crate::tuning::Tuning;

    fn live_state(kinds: &[BlockKind]) -> SessionState {
        let mut state = SessionState::new(&Tuning::default());
        state.stage = Stage::Live;
        for &kind in kinds {
            state.push_block(kind);
        }
        state.clock_ms = 1_000;
        state
    }

    fn targets(actions: &[PointerAction]) -> Vec<BlockId> {
        actions
            .iter()
            .filter_map(|a| match a {
                PointerAction::End(_, id) => Some(*id),
                PointerAction::Start(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_double_tap_presses_twice_inside_window() {
        let actions = gesture_actions(BlockId(4), BlockKind::DoubleTap, 1_000);
        assert_eq!(actions.len(), 4);
        let ends: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                PointerAction::End(s, _) => Some(s.at_ms),
                _ => None,
            })
            .collect();
        assert!(ends[1] - ends[0] < Tuning::default().double_tap_window_ms);
    }

    #[test]
    fn test_prefers_rare_then_oldest_and_skips_avoid() {
        let mut bot = Autoplay::new(1).with_skill(0, 0.0);
        let state = live_state(&[BlockKind::Avoid, BlockKind::Tap, BlockKind::Coins]);
        let coins = state.blocks[2].id();
        assert_eq!(targets(&bot.plan(&state)), vec![coins]);

        let state = live_state(&[BlockKind::Avoid, BlockKind::SwipeUp, BlockKind::Tap]);
        assert_eq!(targets(&bot.plan(&state)), vec![state.blocks[1].id()]);

        let state = live_state(&[BlockKind::Avoid]);
        assert!(bot.plan(&state).is_empty());
    }

    #[test]
    fn test_waits_for_reaction_delay() {
        let mut bot = Autoplay::new(1).with_skill(500, 0.0);
        let mut state = SessionState::new(&Tuning::default());
        state.stage = Stage::Live;
        let id = state.push_block(BlockKind::Tap);
        state.clock_ms = 400;
        assert!(bot.plan(&state).is_empty());
        state.clock_ms = 500;
        assert_eq!(targets(&bot.plan(&state)), vec![id]);
    }

    #[test]
    fn test_blunder_touches_avoid() {
        let mut bot = Autoplay::new(1).with_skill(0, 1.0);
        let state = live_state(&[BlockKind::Tap, BlockKind::Avoid]);
        assert_eq!(targets(&bot.plan(&state)), vec![state.blocks[1].id()]);
    }

    #[test]
    fn test_idle_outside_playable_phases() {
        let mut bot = Autoplay::new(1).with_skill(0, 0.0);
        let mut state = live_state(&[BlockKind::Tap]);
        state.transition_ms = 100;
        assert!(bot.plan(&state).is_empty());
        state.transition_ms = 0;
        state.stage = Stage::GameOver;
        assert!(bot.plan(&state).is_empty());
    }

    #[test]
    fn test_flawless_bot_clears_tutorial_and_survives() {
        let mut session = Session::new(Tuning::default(), 21);
        let mut bot = Autoplay::new(21).with_skill(0, 0.0);
        for _ in 0..2_000 {
            for action in bot.plan(session.state()) {
                session.pointer(action);
            }
            session.tick();
        }
        let state = session.state();
        assert_eq!(state.stage, Stage::Live);
        assert!(state.score > 0);
    }
}
