//! Synchronous game host
//!
//! Wires a [`Session`] to an [`EntitlementStore`]: after every command the
//! pending store requests are executed and their replies fed back, then
//! pushed entitlement changes are merged. Store failures are logged and
//! replaced by their fail-safe values.

use crossbeam_channel::Receiver;

use crate::persistence::{EntitlementStore, Entitlements, UserId};
use crate::sim::{
    Completion, GameEvent, PointerAction, Session, SessionState, Snapshot, StoreRequest,
};
use crate::tuning::Tuning;

pub struct Game<S> {
    session: Session,
    store: S,
    user: UserId,
    updates: Receiver<Entitlements>,
}

impl<S: EntitlementStore> Game<S> {
    pub fn new(mut store: S, user: UserId, tuning: Tuning, seed: u64) -> Self {
        let updates = store.subscribe(&user);
        let mut game = Self {
            session: Session::new(tuning, seed),
            store,
            user,
            updates,
        };
        game.pump();
        game
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access, e.g. for purchases made outside a round
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.session.take_events()
    }

    pub fn pointer(&mut self, action: PointerAction) {
        self.session.pointer(action);
        self.pump();
    }

    pub fn tick(&mut self) {
        self.session.tick();
        self.pump();
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.pump();
    }

    pub fn replay_tutorial(&mut self) {
        self.session.replay_tutorial();
        self.pump();
    }

    /// Run store requests until the session stops asking, then merge pushes
    pub fn pump(&mut self) {
        loop {
            let requests = self.session.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                if let Some(completion) = self.execute(request) {
                    self.session.complete(completion);
                }
            }
        }
        for entitlements in self.updates.try_iter() {
            self.session.apply_entitlements(entitlements);
        }
    }

    fn execute(&mut self, request: StoreRequest) -> Option<Completion> {
        let user = &self.user;
        match request {
            StoreRequest::ConsumeExtraLife { ticket } => {
                let granted = self.store.consume_extra_life(user).unwrap_or_else(|e| {
                    log::warn!("Extra life unavailable: {}", e);
                    false
                });
                Some(Completion::ExtraLife { ticket, granted })
            }
            StoreRequest::FetchEntitlements { ticket } => {
                let entitlements = self.store.entitlements(user).unwrap_or_else(|e| {
                    log::warn!("Entitlements unavailable: {}", e);
                    Entitlements::default()
                });
                Some(Completion::Entitlements { ticket, entitlements })
            }
            StoreRequest::ConsumeDoubleScore => {
                if let Err(e) = self.store.consume_double_score(user) {
                    log::warn!("Failed to consume double score: {}", e);
                }
                None
            }
            StoreRequest::AwardCoins { amount } => {
                if let Err(e) = self.store.award_coins(user, amount) {
                    log::error!("Failed to award {} coins: {}", amount, e);
                }
                None
            }
            StoreRequest::AwardExtraLife { count } => {
                if let Err(e) = self.store.award_extra_life(user, count) {
                    log::error!("Failed to award extra life: {}", e);
                }
                None
            }
            StoreRequest::RecordGameOver { final_score } => {
                if let Err(e) = self.store.record_game_over(user, final_score) {
                    log::warn!("Failed to record game over: {}", e);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{InMemoryStore, ShopItem, UserRecord};
    use crate::sim::autoplay::gesture_actions;
    use crate::sim::{BlockId, BlockKind, GamePhase, GameOverReason};

    fn user() -> UserId {
        UserId::new("player001")
    }

    fn store_with(extra_lives: u64, double_score: u64, coins: u64) -> InMemoryStore {
        let mut record = UserRecord::default();
        record.shop_items.extra_lives = extra_lives;
        record.shop_items.double_score = double_score;
        record.coins = coins;
        InMemoryStore::new().with_record(user(), record)
    }

    /// Live game with a hand-placed board
    fn live(store: InMemoryStore, kinds: &[BlockKind]) -> (Game<InMemoryStore>, Vec<BlockId>) {
        let mut game = Game::new(store, user(), Tuning::default(), 17);
        game.reset();
        let state = game.session.state_mut();
        state.blocks.clear();
        state.batch_size = kinds.len() as u32;
        state.batch_bonus_awarded = false;
        let ids = kinds.iter().map(|&kind| state.push_block(kind)).collect();
        game.take_events();
        (game, ids)
    }

    fn act(game: &mut Game<InMemoryStore>, id: BlockId, at_ms: u64) {
        let kind = game.state().block(id).map(|b| b.kind()).unwrap_or(BlockKind::Tap);
        for action in gesture_actions(id, kind, at_ms) {
            game.pointer(action);
        }
    }

    fn ticks(game: &mut Game<InMemoryStore>, n: u32) {
        for _ in 0..n {
            game.tick();
        }
    }

    fn store_lives(game: &Game<InMemoryStore>) -> u64 {
        game.store().record(&user()).map(|r| r.shop_items.extra_lives).unwrap_or(0)
    }

    #[test]
    fn test_entitlements_loaded_on_start() {
        let game = Game::new(store_with(2, 1, 30), user(), Tuning::default(), 1);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.phase, GamePhase::Tutorial);
        assert_eq!(snapshot.extra_lives, 2);
        assert!(snapshot.double_score_active);
        assert_eq!(snapshot.coins, 30);
    }

    #[test]
    fn test_missing_record_reads_as_nothing_owned() {
        let game = Game::new(InMemoryStore::new(), user(), Tuning::default(), 1);
        assert_eq!(game.state().extra_lives, 0);
        assert!(!game.state().double_score_active);
    }

    #[test]
    fn test_avoid_hit_spends_stored_life() {
        let (mut game, ids) = live(store_with(1, 0, 0), &[BlockKind::Avoid, BlockKind::Tap]);
        act(&mut game, ids[0], 100);
        assert_eq!(game.snapshot().phase, GamePhase::Frozen);
        assert_eq!(store_lives(&game), 0);
        assert_eq!(game.state().extra_lives, 0);

        ticks(&mut game, 10);
        assert_eq!(game.snapshot().phase, GamePhase::Live);
        assert!(game.state().block(ids[0]).is_none());
        assert!(game.state().block(ids[1]).is_some());
    }

    #[test]
    fn test_offline_store_ends_round() {
        let (mut game, ids) = live(store_with(1, 0, 0), &[BlockKind::Avoid]);
        game.store_mut().set_offline(true);
        act(&mut game, ids[0], 100);
        ticks(&mut game, 10);
        assert_eq!(game.snapshot().phase, GamePhase::GameOver);
        game.store_mut().set_offline(false);
        assert_eq!(store_lives(&game), 1);
        assert!(game.take_events().iter().any(|e| matches!(
            e,
            GameEvent::GameOver {
                reason: GameOverReason::AvoidHit,
                ..
            }
        )));
    }

    #[test]
    fn test_expiry_rescue_consumes_each_life_once() {
        let (mut game, _) = live(store_with(3, 0, 0), &[BlockKind::Tap, BlockKind::SwipeDown]);
        ticks(&mut game, 55);
        assert_eq!(store_lives(&game), 1);
        assert_eq!(game.state().extra_lives, 1);
        assert_eq!(game.snapshot().phase, GamePhase::Transitioning);
        ticks(&mut game, 1);
        assert_eq!(game.snapshot().phase, GamePhase::Live);
    }

    #[test]
    fn test_game_over_consumes_double_score_and_records() {
        let (mut game, ids) = live(store_with(0, 2, 0), &[BlockKind::Tap, BlockKind::Tap]);
        act(&mut game, ids[0], 100);
        assert_eq!(game.state().score, 20);
        ticks(&mut game, 60);
        assert_eq!(game.snapshot().phase, GamePhase::GameOver);

        let record = game.store().record(&user()).unwrap();
        assert_eq!(record.shop_items.double_score, 1);
        assert_eq!(record.high_score, 20);
        assert_eq!(record.games_played, 1);
        // The push after consumption still says "active" but the round is over
        assert!(!game.state().double_score_active);

        game.reset();
        assert!(game.state().double_score_active);
    }

    #[test]
    fn test_collected_coins_reach_store() {
        let kinds = [BlockKind::Coins, BlockKind::ExtraLife, BlockKind::Tap];
        let (mut game, ids) = live(store_with(0, 0, 5), &kinds);
        act(&mut game, ids[0], 100);
        act(&mut game, ids[1], 400);
        let record = game.store().record(&user()).unwrap();
        assert_eq!(record.coins, 20);
        assert_eq!(record.total_coins_earned, 15);
        assert_eq!(record.shop_items.extra_lives, 1);
        assert_eq!(game.state().coins, 20);
        assert_eq!(game.state().extra_lives, 1);
    }

    #[test]
    fn test_purchase_pushed_mid_round() {
        let (mut game, _) = live(store_with(0, 0, 45), &[BlockKind::Tap]);
        assert!(game.store_mut().purchase(&user(), ShopItem::ExtraLives, 20).unwrap());
        assert!(game.store_mut().purchase(&user(), ShopItem::ExtraLives, 20).unwrap());
        assert!(!game.store_mut().purchase(&user(), ShopItem::ExtraLives, 20).unwrap());
        game.tick();
        assert_eq!(game.state().extra_lives, 2);
        assert_eq!(game.state().coins, 5);
    }
}
