//! Swipe Blocks - a gesture-reaction arcade game core
//!
//! Core modules:
//! - `sim`: Deterministic round simulation (gestures, spawning, timers, resolution)
//! - `persistence`: Entitlement store interface and user records
//! - `game`: Synchronous host wiring a session to a store
//! - `platform`: Browser bindings
//! - `tuning`: Data-driven game balance

pub mod game;
pub mod persistence;
pub mod platform;
pub mod sim;
pub mod tuning;

pub use game::Game;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation step (ms)
    pub const TICK_MS: u64 = 100;
}
