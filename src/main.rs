//! Swipe Blocks entry point
//!
//! Natively this runs a headless demo: the autoplay bot plays rounds against
//! an in-memory entitlement store and each round is logged. The browser
//! build is driven from JavaScript through `platform::WebGame`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;

    use clap::Parser;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use swipe_blocks::persistence::{EntitlementStore, InMemoryStore, UserId};
    use swipe_blocks::sim::{Autoplay, GameEvent};
    use swipe_blocks::{Game, Tuning};

    /// Headless autoplay demo
    #[derive(Parser)]
    #[command(author, version, about, long_about = None)]
    struct Args {
        /// RNG seed (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Tuning overrides (JSON)
        #[arg(short, long)]
        tuning: Option<PathBuf>,
        /// Rounds to play
        #[arg(short, long, default_value_t = 3)]
        rounds: u32,
        /// Extra lives granted before the first round
        #[arg(long, default_value_t = 1)]
        lives: u32,
        /// Bot reaction delay (ms)
        #[arg(long, default_value_t = 600)]
        reaction_ms: u64,
        /// Bot blunder chance per decision
        #[arg(long, default_value_t = 0.02)]
        blunder: f64,
        /// Give up on a round after this many ticks
        #[arg(long, default_value_t = 20_000)]
        max_ticks: u32,
    }

    fn log_event(event: &GameEvent) {
        match event {
            GameEvent::TutorialComplete => log::info!("Tutorial complete"),
            GameEvent::Rescued { cause } => log::info!("Rescued by an extra life ({:?})", cause),
            GameEvent::ExtraLifeCollected { .. } => log::info!("Extra life collected"),
            GameEvent::CoinsCollected { amount, .. } => log::info!("{} coins collected", amount),
            GameEvent::GameOver { score, reason } => {
                log::info!("Game over ({:?}): {}", reason, score)
            }
            other => log::debug!("{:?}", other),
        }
    }

    pub fn run() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let args = Args::parse();

        let seed = args.seed.unwrap_or_else(rand::random);
        let tuning = args.tuning.as_deref().map(Tuning::load).unwrap_or_default();
        log::info!("Swipe Blocks (native) starting with seed: {}", seed);

        let mut rng = Pcg32::seed_from_u64(seed);
        let user = UserId::generate(&mut rng);
        let mut store = InMemoryStore::new();
        if let Err(e) = store.award_extra_life(&user, args.lives) {
            log::warn!("Could not grant starting lives: {}", e);
        }

        let mut game = Game::new(store, user.clone(), tuning, seed);
        let mut bot = Autoplay::new(seed).with_skill(args.reaction_ms, args.blunder);

        for round in 1..=args.rounds {
            let mut ticks = 0;
            while !game.state().is_game_over() && ticks < args.max_ticks {
                for action in bot.plan(game.state()) {
                    game.pointer(action);
                }
                game.tick();
                ticks += 1;
                for event in game.take_events() {
                    log_event(&event);
                }
            }
            let snapshot = game.snapshot();
            log::info!(
                "Round {}: score {} after {} ticks ({:?})",
                round,
                snapshot.score,
                ticks,
                snapshot.phase
            );
            game.reset();
        }

        if let Some(record) = game.store().record(&user) {
            log::info!(
                "Player {}: high score {}, {} games, {} coins, {} extra lives",
                user,
                record.high_score,
                record.games_played,
                record.coins,
                record.shop_items.extra_lives
            );
            match record.to_json() {
                Ok(json) => log::debug!("Stored record: {}", json),
                Err(e) => log::warn!("Could not encode record: {}", e),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::init, this is just to satisfy the compiler
}
