//! Gesture interpreter
//!
//! Turns a pointer-down/pointer-up pair into a verdict against the block
//! the pointer session targeted. Screen coordinates: +y points down.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::block::BlockKind;
use crate::tuning::Tuning;

/// One pointer/touch sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub pos: Vec2,
    /// Host pointer clock (ms)
    pub at_ms: u64,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, at_ms: u64) -> Self {
        Self {
            pos: Vec2::new(x, y),
            at_ms,
        }
    }
}

/// Classified gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    Tap,
    DoubleTap,
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
}

/// What a finished pointer session means for its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The gesture solves the block
    Solved,
    /// An avoid block was touched
    Triggered,
    /// Nothing happens
    Miss,
}

/// Classify raw motion. Stationary input is always `Tap`; double taps need
/// history and are recognized by [`GestureInterpreter`].
pub fn classify(start: PointerSample, end: PointerSample, tuning: &Tuning) -> Option<Gesture> {
    let delta = end.pos - start.pos;
    let (abs_x, abs_y) = (delta.x.abs(), delta.y.abs());

    if abs_x < tuning.tap_slop_px && abs_y < tuning.tap_slop_px {
        return Some(Gesture::Tap);
    }

    let dt = end.at_ms.saturating_sub(start.at_ms);
    if dt >= tuning.swipe_max_ms {
        return None;
    }

    if abs_x > abs_y && abs_x > tuning.swipe_min_px {
        Some(if delta.x > 0.0 {
            Gesture::SwipeRight
        } else {
            Gesture::SwipeLeft
        })
    } else if abs_y > abs_x && abs_y > tuning.swipe_min_px {
        Some(if delta.y > 0.0 {
            Gesture::SwipeDown
        } else {
            Gesture::SwipeUp
        })
    } else {
        None
    }
}

/// Per-pointer-session interpreter state
#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    anchor: Option<PointerSample>,
    last_tap_ms: Option<u64>,
}

impl GestureInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer down: remember the anchor
    pub fn begin(&mut self, sample: PointerSample) {
        self.anchor = Some(sample);
    }

    /// Pointer up on a block of `kind`. Always clears the anchor.
    pub fn finish(&mut self, sample: PointerSample, kind: BlockKind, tuning: &Tuning) -> Verdict {
        let Some(start) = self.anchor.take() else {
            return Verdict::Miss;
        };

        // Any completed gesture counts as touching an avoid block
        if kind == BlockKind::Avoid {
            return Verdict::Triggered;
        }

        let Some(gesture) = classify(start, sample, tuning) else {
            return Verdict::Miss;
        };

        let gesture = if gesture == Gesture::Tap && kind == BlockKind::DoubleTap {
            match self.last_tap_ms {
                Some(last) if sample.at_ms.saturating_sub(last) < tuning.double_tap_window_ms => {
                    self.last_tap_ms = None;
                    Gesture::DoubleTap
                }
                _ => {
                    self.last_tap_ms = Some(sample.at_ms);
                    return Verdict::Miss;
                }
            }
        } else {
            gesture
        };

        if kind.required_gesture() == Some(gesture) {
            Verdict::Solved
        } else {
            Verdict::Miss
        }
    }

    /// Pointer up somewhere that is not a block
    pub fn cancel(&mut self) {
        self.anchor = None;
    }

    /// Forget the anchor and tap history
    pub fn clear(&mut self) {
        self.anchor = None;
        self.last_tap_ms = None;
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor.is_some()
    }
}
