//! One landmark frame → one discrete gesture.
//!
//! Only three landmarks matter: thumb tip (4), index tip (8) and index
//! knuckle (5).
//!
//! * **Pinch**: thumb–index distance below `pinch_distance`, *or* the index
//!   tip hangs below its own knuckle (a curled finger reads as a pinch even
//!   when the thumb is occluded).
//! * **Open**: not a pinch and the distance exceeds `open_distance`.
//! * **Idle**: anything in between.
//!
//! The classifier keeps no state between frames.

use crate::landmarks::{HandLandmark, LandmarkFrame};

// ════════════════════════════════════════════════════════════════════════════
// GestureKind / GestureEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureKind {
    #[default]
    Idle,
    Pinch,
    Open,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureKind::Idle  => "IDLE",
            GestureKind::Pinch => "PINCH",
            GestureKind::Open  => "OPEN",
        }
    }
}

/// A classified frame. `x, y` is the (mirrored) index fingertip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureEvent {
    pub kind:         GestureKind,
    pub x:            f32,
    pub y:            f32,
    pub timestamp_ms: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierConfig {
    /// Thumb–index distance under which the hand pinches.
    pub pinch_distance: f32,
    /// Thumb–index distance over which a non-pinching hand is open.
    pub open_distance:  f32,
    /// Report `1 - x` so the pointer follows a selfie-mirrored view.
    pub mirror_x:       bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            pinch_distance: 0.08,
            open_distance:  0.12,
            mirror_x:       true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct GestureClassifier {
    pub config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self { GestureClassifier { config } }

    /// Classify one frame. No hand, or non-finite coordinates on the
    /// landmarks used, produce no event.
    pub fn classify(&self, frame: Option<&LandmarkFrame>, timestamp_ms: u64) -> Option<GestureEvent> {
        let frame = frame?;
        let thumb = frame[HandLandmark::ThumbTip];
        let index = frame[HandLandmark::IndexTip];
        let base  = frame[HandLandmark::IndexMcp];
        if !(thumb.is_finite() && index.is_finite() && base.is_finite()) {
            return None;
        }

        let dist = thumb.distance(&index);
        let is_pinch = dist < self.config.pinch_distance || index.y > base.y;
        let is_open  = !is_pinch && dist > self.config.open_distance;

        let kind = if is_pinch {
            GestureKind::Pinch
        } else if is_open {
            GestureKind::Open
        } else {
            GestureKind::Idle
        };

        let x = if self.config.mirror_x { 1.0 - index.x } else { index.x };
        Some(GestureEvent {
            kind,
            x: x.clamp(0.0, 1.0),
            y: index.y.clamp(0.0, 1.0),
            timestamp_ms,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
