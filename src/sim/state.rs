//! Session state and core round types
//!
//! Everything a round reads or mutates lives in [`SessionState`]. The UI
//! only ever sees the read-only [`Snapshot`] projection.

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockId, BlockKind};
use crate::persistence::Entitlements;
use crate::tuning::Tuning;

/// Flat view of the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Scripted single blocks, no timer
    Tutorial,
    /// Timer running, blocks ageing
    Live,
    /// Waiting on an extra-life claim; nothing ages, nothing resolves
    Frozen,
    /// Board just emptied; next batch spawns when this elapses
    Transitioning,
    /// Terminal until reset
    GameOver,
}

/// Underlying round stage; `Frozen` and `Transitioning` are overlays on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Tutorial { step: usize },
    Live,
    GameOver,
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Standard blocks expired without enough lives to cover them
    Timeout,
    /// An avoid block was touched without a life to spend
    AvoidHit,
}

/// Round-generation scoped request token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub generation: u32,
    pub seq: u32,
}

/// What an extra-life claim is trying to save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimCause {
    /// A touched avoid block
    AvoidHit { block: BlockId },
    /// Standard blocks that timed out; success abandons the whole batch
    Expiry,
}

/// Extra lives being consumed one store round-trip at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeClaim {
    pub cause: ClaimCause,
    pub needed: u32,
    pub granted: u32,
    /// Request currently awaiting a completion
    pub outstanding: Option<Ticket>,
    /// A store push arrived while `outstanding` was in flight, so the
    /// mirrored count already reflects that consumption
    pub pushed_since_request: bool,
    /// None while undecided
    pub result: Option<bool>,
}

impl LifeClaim {
    pub fn new(cause: ClaimCause, needed: u32) -> Self {
        Self {
            cause,
            needed,
            granted: 0,
            outstanding: None,
            pushed_since_request: false,
            result: None,
        }
    }
}

/// Frozen sub-phase bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freeze {
    pub elapsed_ms: u32,
    /// Feedback pause that must run out even if the store answers early
    pub min_ms: u32,
    pub claim: LifeClaim,
}

/// Cues for the presentation layer (sound, animation, toasts)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    BatchSpawned { size: u32 },
    TutorialBlock { step: usize, kind: BlockKind },
    Solved { id: BlockId, kind: BlockKind, points: u64 },
    TimerBonus { points: u64 },
    AvoidDodged { id: BlockId, points: u64 },
    Expired { id: BlockId, kind: BlockKind },
    ExtraLifeCollected { id: BlockId },
    CoinsCollected { id: BlockId, amount: u64 },
    Frozen { cause: ClaimCause },
    LifeUsed { remaining: u32 },
    Rescued { cause: ClaimCause },
    TutorialAdvanced { step: usize },
    TutorialComplete,
    GameOver { score: u64, reason: GameOverReason },
}

/// The round aggregate
#[derive(Debug, Clone)]
pub struct SessionState {
    pub stage: Stage,
    /// Active blocks in spawn order
    pub blocks: Vec<Block>,
    pub score: u64,
    /// Countdown for the current batch (ms)
    pub round_timer_ms: u32,
    /// Session clock; only advances on live ticks (ms)
    pub clock_ms: u64,
    /// Mirrored double-score entitlement
    pub double_score_active: bool,
    /// Mirrored extra-life count
    pub extra_lives: u32,
    /// Mirrored coin balance
    pub coins: u64,
    /// Rare blocks become eligible once score reaches this
    pub next_rare_threshold: u64,
    /// Target size the current batch was spawned with
    pub batch_size: u32,
    /// Timer bonus already paid for the current batch
    pub batch_bonus_awarded: bool,
    pub freeze: Option<Freeze>,
    /// Remaining transition pause (ms)
    pub transition_ms: u32,
    /// Bumped on every reset; stale completions are discarded
    pub generation: u32,
    pub events: Vec<GameEvent>,
    next_id: u64,
}

impl SessionState {
    /// Create a fresh state in the tutorial
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            stage: Stage::Tutorial { step: 0 },
            blocks: Vec::new(),
            score: 0,
            round_timer_ms: tuning.round_timer_ms,
            clock_ms: 0,
            double_score_active: false,
            extra_lives: 0,
            coins: 0,
            next_rare_threshold: tuning.rare_threshold_start,
            batch_size: 0,
            batch_bonus_awarded: false,
            freeze: None,
            transition_ms: 0,
            generation: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a block id; ids are never reused within a session
    pub fn next_block_id(&mut self) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        BlockId(id)
    }

    /// Spawn a block at the current clock
    pub fn push_block(&mut self, kind: BlockKind) -> BlockId {
        let id = self.next_block_id();
        self.blocks.push(Block::new(id, kind, self.clock_ms));
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    /// Remove a block; returns it if it was active
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.blocks.iter().position(|b| b.id() == id)?;
        Some(self.blocks.remove(idx))
    }

    /// Standard blocks still waiting for a gesture
    pub fn standing_standard(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.kind().is_standard() && !b.pending_removal)
            .count()
    }

    pub fn phase(&self) -> GamePhase {
        match self.stage {
            Stage::GameOver => GamePhase::GameOver,
            _ if self.freeze.is_some() => GamePhase::Frozen,
            _ if self.transition_ms > 0 => GamePhase::Transitioning,
            Stage::Tutorial { .. } => GamePhase::Tutorial,
            Stage::Live => GamePhase::Live,
        }
    }

    pub fn tutorial_step(&self) -> Option<usize> {
        match self.stage {
            Stage::Tutorial { step } => Some(step),
            _ => None,
        }
    }

    pub fn in_tutorial(&self) -> bool {
        matches!(self.stage, Stage::Tutorial { .. })
    }

    pub fn is_game_over(&self) -> bool {
        self.stage == Stage::GameOver
    }

    /// Apply points with the double-score multiplier
    pub fn scaled_points(&self, base: u64, tuning: &Tuning) -> u64 {
        if self.double_score_active {
            base.saturating_mul(tuning.double_score_multiplier)
        } else {
            base
        }
    }

    /// Merge store-sourced entitlements. The double-score flag is left alone
    /// after game over: it was consumed and only a reset may re-read it.
    pub fn merge_entitlements(&mut self, entitlements: &Entitlements) {
        self.extra_lives = entitlements.extra_lives;
        self.coins = entitlements.coins;
        if !self.is_game_over() {
            self.double_score_active = entitlements.double_score_active;
        }
    }

    /// Read-only projection for the UI
    pub fn snapshot(&self, queued: usize) -> Snapshot {
        Snapshot {
            phase: self.phase(),
            score: self.score,
            round_timer_ms: self.round_timer_ms,
            tutorial_step: self.tutorial_step(),
            blocks: self
                .blocks
                .iter()
                .map(|b| BlockView {
                    id: b.id(),
                    kind: b.kind(),
                    age_ms: b.age_ms(self.clock_ms),
                    pending_removal: b.pending_removal,
                })
                .collect(),
            extra_lives: self.extra_lives,
            coins: self.coins,
            double_score_active: self.double_score_active,
            queued_interactions: queued,
            generation: self.generation,
        }
    }
}

/// UI-facing view of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockView {
    pub id: BlockId,
    pub kind: BlockKind,
    pub age_ms: u64,
    pub pending_removal: bool,
}

/// UI-facing view of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub score: u64,
    pub round_timer_ms: u32,
    pub tutorial_step: Option<usize>,
    pub blocks: Vec<BlockView>,
    pub extra_lives: u32,
    pub coins: u64,
    pub double_score_active: bool,
    pub queued_interactions: usize,
    pub generation: u32,
}
