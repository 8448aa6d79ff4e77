//! Data-driven game balance
//!
//! Every number the round state machine depends on lives here so balance
//! passes never touch simulation code. Missing fields fall back to defaults,
//! so a tuning file only needs to list what it overrides.

use serde::{Deserialize, Serialize};

/// Game balance knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Round timer ===
    /// Round timer value whenever a fresh batch spawns (ms)
    pub round_timer_ms: u32,
    /// Lifetime of swipe/tap/double-tap blocks below `late_game_score` (ms)
    pub standard_lifetime_ms: u32,
    /// Lifetime of swipe/tap/double-tap blocks at or above `late_game_score` (ms)
    pub late_game_lifetime_ms: u32,
    /// Score at which standard blocks start expiring faster
    pub late_game_score: u64,
    /// Lifetime of avoid, extra-life and coins blocks (ms)
    pub special_lifetime_ms: u32,

    // === Scoring ===
    /// Points for solving a standard block
    pub base_score: u64,
    /// Multiplier applied to block points while double score is active
    pub double_score_multiplier: u64,
    /// Points for letting an avoid block expire untouched
    pub avoid_reward: u64,

    // === Spawning ===
    /// Score needed per extra block in a batch
    pub batch_score_step: u64,
    /// Largest batch ever spawned
    pub max_batch: u32,
    /// Rare blocks never spawn below this score
    pub rare_min_score: u64,
    /// Initial rare-block watermark after a reset
    pub rare_threshold_start: u64,
    /// Watermark advance after each rare block
    pub rare_threshold_increment: u64,
    /// Per-slot chance of an extra-life block
    pub extra_life_chance: f64,
    /// Per-slot chance of a coins block
    pub coins_chance: f64,
    /// Coins granted by a coins block
    pub coin_award: u64,

    // === Gestures ===
    /// Movement below this on both axes counts as a tap (px)
    pub tap_slop_px: f32,
    /// Dominant-axis travel needed for a swipe (px)
    pub swipe_min_px: f32,
    /// Slowest accepted swipe (ms)
    pub swipe_max_ms: u64,
    /// Two taps closer than this form a double tap (ms)
    pub double_tap_window_ms: u64,

    // === Sub-phases ===
    /// Feedback pause after an avoid block is triggered (ms)
    pub freeze_ms: u32,
    /// Longest wait on the entitlement store before failing safe (ms)
    pub store_timeout_ms: u32,
    /// Pause between an emptied board and the next batch (ms)
    pub transition_ms: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            round_timer_ms: 6_000,
            standard_lifetime_ms: 5_500,
            late_game_lifetime_ms: 5_000,
            late_game_score: 500,
            special_lifetime_ms: 2_500,

            base_score: 10,
            double_score_multiplier: 2,
            avoid_reward: 10,

            batch_score_step: 75,
            max_batch: 9,
            rare_min_score: 200,
            rare_threshold_start: 200,
            rare_threshold_increment: 200,
            extra_life_chance: 1.0 / 450.0,
            coins_chance: 1.0 / 100.0,
            coin_award: 15,

            tap_slop_px: 10.0,
            swipe_min_px: 30.0,
            swipe_max_ms: 5_000,
            double_tap_window_ms: 300,

            freeze_ms: 1_000,
            store_timeout_ms: 3_000,
            transition_ms: 100,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        Ok(tuning.sanitized())
    }

    /// Clamp values that would wedge the state machine
    pub fn sanitized(mut self) -> Self {
        self.batch_score_step = self.batch_score_step.max(1);
        self.max_batch = self.max_batch.max(1);
        self.double_score_multiplier = self.double_score_multiplier.max(1);
        self.extra_life_chance = clamp_probability(self.extra_life_chance);
        self.coins_chance = clamp_probability(self.coins_chance);
        if !self.tap_slop_px.is_finite() || self.tap_slop_px < 0.0 {
            self.tap_slop_px = Self::default().tap_slop_px;
        }
        if !self.swipe_min_px.is_finite() || self.swipe_min_px < self.tap_slop_px {
            self.swipe_min_px = self.tap_slop_px;
        }
        self.store_timeout_ms = self.store_timeout_ms.max(self.freeze_ms);
        self
    }

    /// Lifetime of a standard block at the given score
    pub fn standard_lifetime(&self, score: u64) -> u32 {
        if score >= self.late_game_score {
            self.late_game_lifetime_ms
        } else {
            self.standard_lifetime_ms
        }
    }

    /// Batch size for a live batch spawned at the given score
    pub fn batch_size(&self, score: u64) -> u32 {
        let extra = score / self.batch_score_step;
        (1 + extra).min(u64::from(self.max_batch)) as u32
    }

    /// Load a tuning file, falling back to defaults on any error
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Invalid tuning file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read tuning file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "base_score": 25, "max_batch": 4 }"#).unwrap();
        assert_eq!(tuning.base_score, 25);
        assert_eq!(tuning.max_batch, 4);
        assert_eq!(tuning.round_timer_ms, 6_000);
        assert_eq!(tuning.coin_award, 15);
    }

    #[test]
    fn test_sanitized_clamps_degenerate_values() {
        let json = r#"{
            "batch_score_step": 0,
            "max_batch": 0,
            "coins_chance": 3.0,
            "double_score_multiplier": 0
        }"#;
        let tuning = Tuning::from_json(json).unwrap();
        assert_eq!(tuning.batch_score_step, 1);
        assert_eq!(tuning.max_batch, 1);
        assert_eq!(tuning.coins_chance, 1.0);
        assert_eq!(tuning.double_score_multiplier, 1);
    }

    #[test]
    fn test_batch_size_ramp() {
        let tuning = Tuning::default();
        assert_eq!(tuning.batch_size(0), 1);
        assert_eq!(tuning.batch_size(74), 1);
        assert_eq!(tuning.batch_size(75), 2);
        assert_eq!(tuning.batch_size(599), 8);
        assert_eq!(tuning.batch_size(600), 9);
        assert_eq!(tuning.batch_size(10_000), 9);
    }

    #[test]
    fn test_late_game_lifetime() {
        let tuning = Tuning::default();
        assert_eq!(tuning.standard_lifetime(499), 5_500);
        assert_eq!(tuning.standard_lifetime(500), 5_000);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }
}
