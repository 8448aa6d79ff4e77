//! Deterministic round simulation
//!
//! All gameplay logic lives here. This module must stay pure and
//! deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering, storage or platform dependencies; store work leaves as
//!   [`StoreRequest`]s and comes back as [`Completion`]s

pub mod autoplay;
pub mod block;
pub mod gesture;
pub mod resolve;
pub mod session;
pub mod spawn;
pub mod state;
pub mod tick;

pub use autoplay::{Autoplay, gesture_actions};
pub use block::{Block, BlockId, BlockKind};
pub use gesture::{Gesture, GestureInterpreter, PointerSample, Verdict, classify};
pub use resolve::{Outcome, resolve, round_to_nearest_5, timer_bonus};
pub use session::{Completion, PointerAction, Session, StoreRequest};
pub use spawn::{Roller, TUTORIAL_SCRIPT, roll_slot, spawn};
pub use state::{
    BlockView, ClaimCause, Freeze, GameEvent, GameOverReason, GamePhase, LifeClaim, SessionState,
    Snapshot, Stage, Ticket,
};
pub use tick::{Expiry, advance};
