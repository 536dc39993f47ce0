//! Volumetric cone distribution: the "tree".
//!
//! Heights are drawn as `cbrt(u)` so that density grows toward the wide base
//! (uniform density in a cone's volume), and the radial distance as
//! `sqrt(u)` of the local radius (uniform density over each disc slice).
//!
//! ```text
//!          apex  y =   8
//!           /\
//!          /  \
//!         /    \
//!        /______\  y = -32, radius 15
//! ```

use std::f32::consts::TAU;

use rand::Rng;

use crate::color::Rgb;

/// Apex height.
pub const TREE_TOP_Y: f32 = 8.0;
/// Apex → base distance.
pub const TREE_HEIGHT: f32 = 40.0;
/// Base radius.
pub const TREE_RADIUS: f32 = 15.0;
/// Full width of the per-channel color jitter (±half of this).
pub const COLOR_JITTER: f32 = 0.15;

/// A freshly generated tree: positions and matching colors.
#[derive(Clone, Debug)]
pub struct TreeSample {
    /// Flat `x, y, z` triples, `3·count` long.
    pub positions: Vec<f32>,
    /// Flat `r, g, b` triples, `3·count` long.
    pub colors:    Vec<f32>,
}

impl TreeSample {
    pub fn len(&self) -> usize { self.positions.len() / 3 }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
}

/// Generate `count` tree particles around `base` color.
///
/// Repeated calls give different point sets with the same envelope:
/// height 40, base radius 15, apex at `y = 8`.
pub fn generate<R: Rng + ?Sized>(count: usize, base: Rgb, rng: &mut R) -> TreeSample {
    TreeSample {
        positions: tree_positions(count, rng),
        colors:    tree_colors(count, base, rng),
    }
}

/// Positions only.
pub fn tree_positions<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<f32> {
    let mut pos = Vec::with_capacity(count * 3);
    for _ in 0..count {
        let h: f32 = rng.gen::<f32>().cbrt();
        let y = TREE_TOP_Y - h * TREE_HEIGHT;
        let r = h * TREE_RADIUS * rng.gen::<f32>().sqrt();
        let a = rng.gen::<f32>() * TAU;
        pos.extend_from_slice(&[a.cos() * r, y, a.sin() * r]);
    }
    pos
}

/// Per-particle colors: `base` plus independent uniform jitter of
/// `±COLOR_JITTER / 2` on every channel. Not clamped.
pub fn tree_colors<R: Rng + ?Sized>(count: usize, base: Rgb, rng: &mut R) -> Vec<f32> {
    let mut col = Vec::with_capacity(count * 3);
    for _ in 0..count {
        for channel in base.to_array() {
            col.push(channel + (rng.gen::<f32>() - 0.5) * COLOR_JITTER);
        }
    }
    col
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
