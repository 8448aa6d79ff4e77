//! In-memory entitlement store
//!
//! HashMap-backed stand-in for the cloud document store. Used by the native
//! demo and tests; supports raw-document seeding (to exercise lenient
//! decoding) and an offline switch (to exercise the fail-safe paths).

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::record::{ShopItem, UserRecord};
use super::{EntitlementStore, Entitlements, StoreError, UserId};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: HashMap<UserId, UserRecord>,
    subscribers: Vec<(UserId, Sender<Entitlements>)>,
    offline: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a decoded record
    pub fn with_record(mut self, user: UserId, record: UserRecord) -> Self {
        self.records.insert(user, record);
        self
    }

    /// Seed from a raw stored document
    pub fn insert_json(&mut self, user: UserId, json: &str) -> Result<(), StoreError> {
        let record = UserRecord::from_json(json)?;
        self.records.insert(user.clone(), record);
        self.notify(&user);
        Ok(())
    }

    pub fn record(&self, user: &UserId) -> Option<&UserRecord> {
        self.records.get(user)
    }

    /// Simulate a network outage: every call fails until switched back
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Change a record outside the game (e.g. a shop purchase) and push it
    /// to subscribers
    pub fn update(&mut self, user: &UserId, f: impl FnOnce(&mut UserRecord)) {
        f(self.records.entry(user.clone()).or_default());
        self.notify(user);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("offline".to_string()))
        } else {
            Ok(())
        }
    }

    /// Shop purchase. A missing record is created empty and the purchase
    /// refused; a successful one is pushed to subscribers.
    pub fn purchase(
        &mut self,
        user: &UserId,
        item: ShopItem,
        price: u64,
    ) -> Result<bool, StoreError> {
        let bought = self.initialized(user)?.purchase(item, price);
        if bought {
            self.notify(user);
        }
        Ok(bought)
    }

    fn existing(&mut self, user: &UserId) -> Result<&mut UserRecord, StoreError> {
        self.check_online()?;
        self.records
            .get_mut(user)
            .ok_or_else(|| StoreError::MissingRecord(user.clone()))
    }

    /// Record for writes that must never be dropped: created when missing
    fn initialized(&mut self, user: &UserId) -> Result<&mut UserRecord, StoreError> {
        self.check_online()?;
        Ok(self.records.entry(user.clone()).or_insert_with(|| {
            log::info!("Initializing record for {}", user);
            UserRecord::default()
        }))
    }

    fn notify(&mut self, user: &UserId) {
        let Some(entitlements) = self.records.get(user).map(UserRecord::entitlements) else {
            return;
        };
        // Dropped receivers unsubscribe themselves
        self.subscribers
            .retain(|(id, tx)| id != user || tx.send(entitlements).is_ok());
    }
}

impl EntitlementStore for InMemoryStore {
    fn entitlements(&mut self, user: &UserId) -> Result<Entitlements, StoreError> {
        Ok(self.existing(user)?.entitlements())
    }

    fn consume_extra_life(&mut self, user: &UserId) -> Result<bool, StoreError> {
        let consumed = self.existing(user)?.consume_extra_life();
        if consumed {
            self.notify(user);
        }
        Ok(consumed)
    }

    fn consume_double_score(&mut self, user: &UserId) -> Result<bool, StoreError> {
        let consumed = self.existing(user)?.consume_double_score();
        if consumed {
            self.notify(user);
        }
        Ok(consumed)
    }

    fn award_coins(&mut self, user: &UserId, amount: u64) -> Result<(), StoreError> {
        self.initialized(user)?.award_coins(amount);
        self.notify(user);
        Ok(())
    }

    fn award_extra_life(&mut self, user: &UserId, count: u32) -> Result<(), StoreError> {
        self.initialized(user)?.award_extra_lives(count);
        self.notify(user);
        Ok(())
    }

    fn record_game_over(&mut self, user: &UserId, final_score: u64) -> Result<(), StoreError> {
        self.initialized(user)?.record_game_over(final_score);
        Ok(())
    }

    fn subscribe(&mut self, user: &UserId) -> Receiver<Entitlements> {
        let (tx, rx) = unbounded();
        self.subscribers.push((user.clone(), tx));
        rx
    }
}
