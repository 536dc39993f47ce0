//! Hand-landmark frames in the 21-point MediaPipe topology.
//!
//! Coordinates are normalized image coordinates: `x` grows to the right of
//! the (unmirrored) camera image, `y` grows downward, both nominally in
//! `0.0..=1.0`.

use std::fmt;
use std::ops::Index;

/// Points per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Named landmark indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandLandmark {
    pub fn index(self) -> usize { self as usize }
}

/// Bone segments drawn by the skeleton overlay (index pairs).
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

// ════════════════════════════════════════════════════════════════════════════
// Landmark / LandmarkFrame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self { Landmark { x, y } }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() }

    /// Planar distance.
    pub fn distance(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Landmark { Landmark::new(self.x + dx, self.y + dy) }
}

/// One detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self { LandmarkFrame { points } }

    /// Build from a detector's point list, which must hold exactly 21 points.
    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            LandmarkError::WrongCount { expected: LANDMARK_COUNT, found: points.len() }
        })?;
        Ok(LandmarkFrame { points })
    }

    pub fn from_xy(pairs: &[(f32, f32)]) -> Result<Self, LandmarkError> {
        let pts: Vec<Landmark> = pairs.iter().map(|&(x, y)| Landmark::new(x, y)).collect();
        Self::from_slice(&pts)
    }

    pub fn get(&self, lm: HandLandmark) -> Landmark { self.points[lm.index()] }

    pub fn set(&mut self, lm: HandLandmark, p: Landmark) { self.points[lm.index()] = p; }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] { &self.points }
}

impl Index<HandLandmark> for LandmarkFrame {
    type Output = Landmark;
    fn index(&self, lm: HandLandmark) -> &Landmark { &self.points[lm.index()] }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandmarkError {
    WrongCount { expected: usize, found: usize },
}

impl fmt::Display for LandmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandmarkError::WrongCount { expected, found } => {
                write!(f, "hand frame needs {} landmarks, got {}", expected, found)
            }
        }
    }
}

impl std::error::Error for LandmarkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_requires_21_points() {
        let short = vec![(0.5, 0.5); 20];
        assert_eq!(
            LandmarkFrame::from_xy(&short),
            Err(LandmarkError::WrongCount { expected: 21, found: 20 })
        );
        let ok = vec![(0.5, 0.5); 21];
        assert!(LandmarkFrame::from_xy(&ok).is_ok());
    }

    #[test]
    fn named_indices_match_topology() {
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexMcp.index(), 5);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
    }

    #[test]
    fn connections_stay_in_range() {
        assert!(HAND_CONNECTIONS.iter().all(|&(a, b)| a < LANDMARK_COUNT && b < LANDMARK_COUNT));
    }
}
