//! Entitlement persistence
//!
//! The round state machine never talks to storage itself. Hosts drive an
//! [`EntitlementStore`] with the requests the session emits; this module
//! defines that interface, the persisted user document and an in-memory
//! store used by the native demo and the tests.
//!
//! Failure policy: every store error means "entitlement unavailable". Hosts
//! log it and substitute the fail-safe value (false / zero).

pub mod memory;
pub mod record;

pub use memory::InMemoryStore;
pub use record::{Achievement, ShopItem, ShopItems, UserRecord, default_achievements};

use crossbeam_channel::Receiver;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Anonymous device-generated user identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Length of generated ids
    pub const LEN: usize = 9;

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random lowercase base-36 id
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let id = (0..Self::LEN)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Externally persisted resources mirrored into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entitlements {
    pub extra_lives: u32,
    pub double_score_active: bool,
    pub coins: u64,
}

/// Store failures; all of them are recoverable from the player's view
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entitlement store unavailable: {0}")]
    Unavailable(String),
    #[error("no record for user {0}")]
    MissingRecord(UserId),
    #[error("corrupt user record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Collaborator interface for entitlement reads and writes
pub trait EntitlementStore {
    /// Current entitlements for `user`
    fn entitlements(&mut self, user: &UserId) -> Result<Entitlements, StoreError>;

    /// Spend one extra life; `Ok(false)` when none was available
    fn consume_extra_life(&mut self, user: &UserId) -> Result<bool, StoreError>;

    /// Spend one double-score charge; `Ok(false)` when none was available
    fn consume_double_score(&mut self, user: &UserId) -> Result<bool, StoreError>;

    /// Grant coins. A missing record is created first, never skipped.
    fn award_coins(&mut self, user: &UserId, amount: u64) -> Result<(), StoreError>;

    /// Grant extra lives. A missing record is created first.
    fn award_extra_life(&mut self, user: &UserId, count: u32) -> Result<(), StoreError>;

    /// Stats and achievements bookkeeping after a round
    fn record_game_over(&mut self, user: &UserId, final_score: u64) -> Result<(), StoreError>;

    /// Push channel for entitlement changes made outside the session
    fn subscribe(&mut self, user: &UserId) -> Receiver<Entitlements>;
}

/// Clamp a stored number to a non-negative whole count. NaN, infinities and
/// negatives become zero.
pub fn sanitize_count(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    if value >= u64::MAX as f64 {
        return u64::MAX;
    }
    value.floor() as u64
}
