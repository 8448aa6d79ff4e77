//! Persisted user document
//!
//! Decoding is lenient: absent fields default, numeric fields holding
//! garbage (strings, nulls, negatives, fractions) are clamped to whole
//! non-negative counts so corrupt data never reaches the session.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Entitlements, StoreError, sanitize_count};

/// Achievement ids the game updates
pub const HIGH_SCORER: &str = "highScorer";
pub const COIN_COLLECTOR: &str = "coinCollector";
pub const BALLOON_POPPER: &str = "balloonPopper";
pub const GAME_PLAYER: &str = "gamePlayer";

/// Progress towards one tiered achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Progress thresholds, ascending
    #[serde(default, deserialize_with = "lenient_counts")]
    pub levels: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub progress: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub coin_reward: u64,
}

impl Achievement {
    fn new(id: &str, title: &str, levels: [u64; 3], coin_reward: u64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            levels: levels.to_vec(),
            progress: 0,
            coin_reward,
        }
    }

    /// Number of thresholds reached
    pub fn level(&self) -> usize {
        self.levels.iter().filter(|&&l| self.progress >= l).count()
    }
}

/// Achievement catalogue for new players
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement::new(HIGH_SCORER, "High Scorer", [100, 1_000, 5_000], 100),
        Achievement::new(COIN_COLLECTOR, "Coin Collector", [100, 500, 1_000], 50),
        Achievement::new(BALLOON_POPPER, "Balloon Popper", [12, 40, 120], 100),
        Achievement::new(GAME_PLAYER, "Game Player", [5, 20, 200], 50),
    ]
}

/// Shop item ids as stored under `shopItems`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopItem {
    #[serde(rename = "extra-lives")]
    ExtraLives,
    #[serde(rename = "double-score")]
    DoubleScore,
}

/// Purchasable consumables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopItems {
    #[serde(rename = "extra-lives", deserialize_with = "lenient_count")]
    pub extra_lives: u64,
    #[serde(rename = "double-score", deserialize_with = "lenient_count")]
    pub double_score: u64,
}

/// One player's document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    #[serde(deserialize_with = "lenient_count")]
    pub coins: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub total_coins_earned: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub high_score: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub games_played: u64,
    #[serde(deserialize_with = "lenient_count")]
    pub balloons_popped: u64,
    pub shop_items: ShopItems,
    pub achievements: Vec<Achievement>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            coins: 0,
            total_coins_earned: 0,
            high_score: 0,
            games_played: 0,
            balloons_popped: 0,
            shop_items: ShopItems::default(),
            achievements: default_achievements(),
        }
    }
}

impl UserRecord {
    /// Decode a stored document
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn entitlements(&self) -> Entitlements {
        Entitlements {
            extra_lives: u32::try_from(self.shop_items.extra_lives).unwrap_or(u32::MAX),
            double_score_active: self.shop_items.double_score > 0,
            coins: self.coins,
        }
    }

    /// Add coins to the balance and the lifetime total
    pub fn award_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
        self.total_coins_earned = self.total_coins_earned.saturating_add(amount);
        self.set_progress(COIN_COLLECTOR, self.total_coins_earned);
    }

    pub fn award_extra_lives(&mut self, count: u32) {
        self.shop_items.extra_lives = self.shop_items.extra_lives.saturating_add(u64::from(count));
    }

    /// Buy one `item` for `price` coins. Refused, with nothing changed,
    /// when the balance is short.
    pub fn purchase(&mut self, item: ShopItem, price: u64) -> bool {
        if self.coins < price {
            return false;
        }
        self.coins -= price;
        let count = match item {
            ShopItem::ExtraLives => &mut self.shop_items.extra_lives,
            ShopItem::DoubleScore => &mut self.shop_items.double_score,
        };
        *count = count.saturating_add(1);
        true
    }

    pub fn award_balloon_pops(&mut self, count: u64) {
        self.balloons_popped = self.balloons_popped.saturating_add(count);
        self.set_progress(BALLOON_POPPER, self.balloons_popped);
    }

    pub fn consume_extra_life(&mut self) -> bool {
        take_one(&mut self.shop_items.extra_lives)
    }

    pub fn consume_double_score(&mut self) -> bool {
        take_one(&mut self.shop_items.double_score)
    }

    /// Round finished: bump stats and the achievements that track them
    pub fn record_game_over(&mut self, final_score: u64) {
        self.games_played = self.games_played.saturating_add(1);
        self.high_score = self.high_score.max(final_score);
        self.set_progress(HIGH_SCORER, self.high_score);
        self.set_progress(GAME_PLAYER, self.games_played);
    }

    /// Set an achievement's progress, restoring it from the catalogue when
    /// the stored document lost it
    pub fn set_progress(&mut self, id: &str, progress: u64) {
        if let Some(achievement) = self.achievements.iter_mut().find(|a| a.id == id) {
            achievement.progress = progress;
            return;
        }
        if let Some(mut achievement) = default_achievements().into_iter().find(|a| a.id == id) {
            achievement.progress = progress;
            self.achievements.push(achievement);
        }
    }

    pub fn achievement(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }
}

fn take_one(count: &mut u64) -> bool {
    if *count > 0 {
        *count -= 1;
        true
    } else {
        false
    }
}

fn count_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else {
                n.as_f64().map(sanitize_count).unwrap_or(0)
            }
        }
        Value::String(s) => s.trim().parse::<f64>().map(sanitize_count).unwrap_or(0),
        _ => 0,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

fn lenient_counts<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(count_from_value).collect(),
        _ => Vec::new(),
    })
}
