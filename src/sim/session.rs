//! Round state machine host
//!
//! `Session` owns the [`SessionState`] and is the only thing that mutates
//! it. Every command takes `&mut self` and runs to completion, so a tick and
//! a gesture resolution can never interleave.
//!
//! Store I/O is sans-IO: the session appends [`StoreRequest`]s to an outbox
//! and the host answers with [`Completion`]s whenever its store replies.
//! Confirmed gestures go through a FIFO queue that is only drained while no
//! extra-life claim is in flight.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::block::BlockId;
use super::gesture::{GestureInterpreter, PointerSample, Verdict};
use super::resolve::{Outcome, resolve};
use super::spawn::{TUTORIAL_SCRIPT, spawn};
use super::state::{
    ClaimCause, Freeze, GameEvent, GameOverReason, LifeClaim, SessionState, Snapshot, Stage, Ticket,
};
use super::tick::{Expiry, advance};
use crate::consts::TICK_MS;
use crate::persistence::Entitlements;
use crate::tuning::Tuning;

/// Work the host must carry out against the entitlement store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreRequest {
    /// Answer with [`Completion::ExtraLife`]
    ConsumeExtraLife { ticket: Ticket },
    /// Answer with [`Completion::Entitlements`]
    FetchEntitlements { ticket: Ticket },
    ConsumeDoubleScore,
    AwardCoins { amount: u64 },
    AwardExtraLife { count: u32 },
    /// Fire-and-forget stats update
    RecordGameOver { final_score: u64 },
}

/// Store replies fed back into the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Completion {
    ExtraLife { ticket: Ticket, granted: bool },
    Entitlements { ticket: Ticket, entitlements: Entitlements },
}

/// Pointer command, as produced by a UI layer or the autoplay bot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerAction {
    Start(PointerSample),
    End(PointerSample, BlockId),
}

/// A confirmed gesture waiting its turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedAction {
    block: BlockId,
    generation: u32,
}

pub struct Session {
    state: SessionState,
    tuning: Tuning,
    rng: Pcg32,
    gestures: GestureInterpreter,
    queue: VecDeque<QueuedAction>,
    outbox: Vec<StoreRequest>,
    pending_refresh: Option<Ticket>,
    next_seq: u32,
}

impl Session {
    /// New session starting in the tutorial
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let tuning = tuning.sanitized();
        let mut session = Self {
            state: SessionState::new(&tuning),
            tuning,
            rng: Pcg32::seed_from_u64(seed),
            gestures: GestureInterpreter::new(),
            queue: VecDeque::new(),
            outbox: Vec::new(),
            pending_refresh: None,
            next_seq: 0,
        };
        session.restart(Stage::Tutorial { step: 0 });
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot(self.queue.len())
    }

    /// Number of confirmed gestures waiting to resolve
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drain pending store requests
    pub fn take_requests(&mut self) -> Vec<StoreRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Drain presentation cues
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.state.events)
    }

    // === Commands ===

    /// Pointer down on the board
    pub fn start_interaction(&mut self, sample: PointerSample) {
        if self.state.is_game_over() {
            return;
        }
        self.gestures.begin(sample);
    }

    /// Pointer up over `block`
    pub fn end_interaction(&mut self, sample: PointerSample, block: BlockId) {
        if self.state.is_game_over() {
            self.gestures.clear();
            return;
        }
        let Some(kind) = self.state.block(block).map(|b| b.kind()) else {
            self.gestures.cancel();
            return;
        };

        match self.gestures.finish(sample, kind, &self.tuning) {
            Verdict::Solved | Verdict::Triggered => {
                log::debug!("Gesture accepted on {} ({:?})", block, kind);
                self.queue.push_back(QueuedAction {
                    block,
                    generation: self.state.generation,
                });
                self.drain();
                self.refill();
            }
            Verdict::Miss => {}
        }
    }

    pub fn pointer(&mut self, action: PointerAction) {
        match action {
            PointerAction::Start(sample) => self.start_interaction(sample),
            PointerAction::End(sample, block) => self.end_interaction(sample, block),
        }
    }

    /// Advance one fixed step of `TICK_MS`
    pub fn tick(&mut self) {
        if self.state.is_game_over() {
            return;
        }

        if self.state.freeze.is_some() {
            self.tick_freeze();
            self.refill();
            return;
        }

        if self.state.transition_ms > 0 {
            self.state.transition_ms = self.state.transition_ms.saturating_sub(TICK_MS as u32);
            self.refill();
            return;
        }

        match advance(&mut self.state, &self.tuning) {
            Expiry::Quiet => {}
            Expiry::Rescue { needed } => self.start_claim(ClaimCause::Expiry, needed, 0),
            Expiry::Fatal => self.game_over(GameOverReason::Timeout),
        }
        self.end_batch_if_empty();
        self.refill();
    }

    /// Play again after game over: straight into a live round
    pub fn reset(&mut self) {
        self.restart(Stage::Live);
    }

    /// Restart into the tutorial script
    pub fn replay_tutorial(&mut self) {
        self.restart(Stage::Tutorial { step: 0 });
    }

    /// Store reply for an earlier request
    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::ExtraLife { ticket, granted } => self.complete_life(ticket, granted),
            Completion::Entitlements { ticket, entitlements } => {
                if self.pending_refresh != Some(ticket) {
                    log::warn!("Discarding stale entitlement refresh {:?}", ticket);
                    return;
                }
                self.pending_refresh = None;
                self.apply_entitlements(entitlements);
            }
        }
    }

    /// Entitlements pushed by the store subscription
    pub fn apply_entitlements(&mut self, entitlements: Entitlements) {
        log::debug!("Entitlements: {:?}", entitlements);
        self.state.merge_entitlements(&entitlements);
        if let Some(freeze) = self.state.freeze.as_mut() {
            if freeze.claim.outstanding.is_some() {
                freeze.claim.pushed_since_request = true;
            }
        }
    }

    // === Internals ===

    fn restart(&mut self, stage: Stage) {
        let tuning = &self.tuning;
        let state = &mut self.state;
        state.generation = state.generation.wrapping_add(1);
        state.stage = stage;
        state.blocks.clear();
        state.score = 0;
        state.round_timer_ms = tuning.round_timer_ms;
        state.freeze = None;
        state.transition_ms = 0;
        state.next_rare_threshold = tuning.rare_threshold_start;
        state.batch_size = 0;
        state.batch_bonus_awarded = false;
        // Never trust the old flag; the refresh below re-reads it
        state.double_score_active = false;

        self.queue.clear();
        self.gestures.clear();
        self.next_seq = 0;

        let ticket = self.new_ticket();
        self.pending_refresh = Some(ticket);
        self.outbox.push(StoreRequest::FetchEntitlements { ticket });

        log::info!("Round {} starting ({:?})", self.state.generation, stage);
        self.refill();
    }

    fn new_ticket(&mut self) -> Ticket {
        let ticket = Ticket {
            generation: self.state.generation,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        ticket
    }

    /// Spawn the next batch when the board is empty and nothing is pending
    fn refill(&mut self) {
        let state = &self.state;
        let busy = state.freeze.is_some() || state.transition_ms > 0;
        if state.is_game_over() || busy || !state.blocks.is_empty() {
            return;
        }
        spawn(&mut self.state, &self.tuning, &mut self.rng);
    }

    /// Enter the transition pause once the board empties
    fn end_batch_if_empty(&mut self) {
        let state = &mut self.state;
        if state.blocks.is_empty() && !state.is_game_over() && state.freeze.is_none() {
            state.transition_ms = self.tuning.transition_ms;
        }
    }

    /// Resolve queued gestures in order until one needs the store
    fn drain(&mut self) {
        while self.state.freeze.is_none() && !self.state.is_game_over() {
            let Some(action) = self.queue.pop_front() else {
                break;
            };
            if action.generation != self.state.generation {
                continue;
            }
            let Some(block) = self.state.block(action.block).filter(|b| !b.pending_removal) else {
                continue;
            };
            let outcome = resolve(block, &self.state, &self.tuning);
            self.apply(action.block, outcome);
        }
    }

    fn apply(&mut self, id: BlockId, outcome: Outcome) {
        match outcome {
            Outcome::TutorialAdvance => {
                self.state.remove_block(id);
                self.advance_tutorial();
            }
            Outcome::Score { points, bonus } => {
                if let Some(block) = self.state.remove_block(id) {
                    self.state.score += points;
                    self.state.events.push(GameEvent::Solved {
                        id,
                        kind: block.kind(),
                        points,
                    });
                }
                if let Some(bonus) = bonus {
                    self.state.score += bonus;
                    self.state.batch_bonus_awarded = true;
                    self.state.events.push(GameEvent::TimerBonus { points: bonus });
                    log::debug!("Timer bonus {} ({} ms left)", bonus, self.state.round_timer_ms);
                }
                self.end_batch_if_empty();
            }
            Outcome::AwardExtraLife => {
                self.state.remove_block(id);
                self.state.extra_lives = self.state.extra_lives.saturating_add(1);
                self.outbox.push(StoreRequest::AwardExtraLife { count: 1 });
                self.state.events.push(GameEvent::ExtraLifeCollected { id });
                self.end_batch_if_empty();
            }
            Outcome::AwardCoins { amount } => {
                self.state.remove_block(id);
                self.outbox.push(StoreRequest::AwardCoins { amount });
                self.state.events.push(GameEvent::CoinsCollected { id, amount });
                self.end_batch_if_empty();
            }
            Outcome::ClaimLife => {
                if let Some(block) = self.state.block_mut(id) {
                    block.pending_removal = true;
                }
                log::info!("Avoid block {} triggered", id);
                self.start_claim(ClaimCause::AvoidHit { block: id }, 1, self.tuning.freeze_ms);
            }
        }
    }

    fn advance_tutorial(&mut self) {
        let Stage::Tutorial { step } = self.state.stage else {
            return;
        };
        let next = step + 1;
        if next >= TUTORIAL_SCRIPT.len() {
            self.state.stage = Stage::Live;
            self.state.score = 0;
            self.state.round_timer_ms = self.tuning.round_timer_ms;
            self.state.events.push(GameEvent::TutorialComplete);
            log::info!("Tutorial complete");
        } else {
            self.state.stage = Stage::Tutorial { step: next };
            self.state.events.push(GameEvent::TutorialAdvanced { step: next });
        }
        self.state.transition_ms = self.tuning.transition_ms;
    }

    /// Freeze and start spending `needed` lives
    fn start_claim(&mut self, cause: ClaimCause, needed: u32, min_ms: u32) {
        let mut claim = LifeClaim::new(cause, needed);
        if self.state.extra_lives < needed {
            claim.result = Some(false);
        } else {
            let ticket = self.new_ticket();
            claim.outstanding = Some(ticket);
            self.outbox.push(StoreRequest::ConsumeExtraLife { ticket });
        }
        self.state.freeze = Some(Freeze {
            elapsed_ms: 0,
            min_ms,
            claim,
        });
        self.state.events.push(GameEvent::Frozen { cause });
        self.try_settle();
    }

    fn complete_life(&mut self, ticket: Ticket, granted: bool) {
        let Some(freeze) = self.state.freeze.as_mut() else {
            log::warn!("Discarding extra-life reply {:?} with no claim in flight", ticket);
            return;
        };
        let claim = &mut freeze.claim;
        if claim.outstanding != Some(ticket) {
            log::warn!("Discarding stale extra-life reply {:?}", ticket);
            return;
        }
        claim.outstanding = None;
        let already_mirrored = std::mem::take(&mut claim.pushed_since_request);

        if !granted {
            claim.result = Some(false);
        } else {
            claim.granted += 1;
            let done = claim.granted >= claim.needed;
            if done {
                claim.result = Some(true);
            }
            if !already_mirrored {
                self.state.extra_lives = self.state.extra_lives.saturating_sub(1);
            }
            self.state.events.push(GameEvent::LifeUsed {
                remaining: self.state.extra_lives,
            });
            if !done {
                let ticket = self.new_ticket();
                if let Some(freeze) = self.state.freeze.as_mut() {
                    freeze.claim.outstanding = Some(ticket);
                }
                self.outbox.push(StoreRequest::ConsumeExtraLife { ticket });
            }
        }
        self.try_settle();
    }

    fn tick_freeze(&mut self) {
        let timeout = self.tuning.store_timeout_ms;
        if let Some(freeze) = self.state.freeze.as_mut() {
            freeze.elapsed_ms = freeze.elapsed_ms.saturating_add(TICK_MS as u32);
            if freeze.claim.result.is_none() && freeze.elapsed_ms >= timeout {
                log::warn!("Extra-life check timed out after {} ms", freeze.elapsed_ms);
                freeze.claim.outstanding = None;
                freeze.claim.result = Some(false);
            }
        }
        self.try_settle();
    }

    /// Apply a decided claim once its feedback pause has run out
    fn try_settle(&mut self) {
        let ready = self
            .state
            .freeze
            .as_ref()
            .and_then(|f| f.claim.result.filter(|_| f.elapsed_ms >= f.min_ms));
        let Some(success) = ready else {
            return;
        };
        let Some(freeze) = self.state.freeze.take() else {
            return;
        };
        let cause = freeze.claim.cause;

        if !success {
            let reason = match cause {
                ClaimCause::AvoidHit { .. } => GameOverReason::AvoidHit,
                ClaimCause::Expiry => GameOverReason::Timeout,
            };
            self.game_over(reason);
            return;
        }

        match cause {
            ClaimCause::AvoidHit { block } => {
                self.state.remove_block(block);
            }
            ClaimCause::Expiry => {
                // The batch is abandoned
                self.state.blocks.clear();
            }
        }
        log::info!("Extra life used ({:?}), {} left", cause, self.state.extra_lives);
        self.state.events.push(GameEvent::Rescued { cause });
        self.end_batch_if_empty();
        self.drain();
        self.refill();
    }

    fn game_over(&mut self, reason: GameOverReason) {
        let score = self.state.score;
        self.state.stage = Stage::GameOver;
        self.state.blocks.clear();
        self.state.freeze = None;
        self.state.transition_ms = 0;
        self.queue.clear();
        self.gestures.clear();

        self.outbox.push(StoreRequest::RecordGameOver { final_score: score });
        if self.state.double_score_active {
            self.state.double_score_active = false;
            self.outbox.push(StoreRequest::ConsumeDoubleScore);
        }
        self.state.events.push(GameEvent::GameOver { score, reason });
        log::info!("Game over ({:?}) with score {}", reason, score);
    }
}
