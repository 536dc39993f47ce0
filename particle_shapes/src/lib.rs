//! # particle_shapes
//!
//! Point distributions the morph display converges toward.
//!
//! | Shape | Entry point | Output |
//! |---|---|---|
//! | Volumetric cone ("tree") | [`tree::generate`] | `3·count` positions + colors |
//! | Tree coloring only | [`tree::tree_colors`] | `3·count` colors |
//! | Rasterized text | [`glyph::GlyphSampler::sample`] | `3·k` positions, `k` ≈ glyph coverage |
//!
//! All buffers are flat `Vec<f32>` triples (`x, y, z` or `r, g, b`), the
//! layout the particle field and the renderer share.
//!
//! Randomness is always supplied by the caller as a [`rand::Rng`], so a
//! seeded `StdRng` reproduces a distribution exactly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use particle_shapes::{tree, glyph::GlyphSampler, Rgb};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let green = Rgb::from_hex("#80ffaa").unwrap();
//! let sample = tree::generate(15_000, green, &mut rng);
//! assert_eq!(sample.positions.len(), 45_000);
//!
//! let sampler = GlyphSampler::new().unwrap();
//! let text = sampler.sample("Dear Friend", 40.0, 20.0);
//! assert_eq!(text.len() % 3, 0);
//! ```

use std::fmt;

pub mod color;
pub mod glyph;
pub mod tree;

pub use color::{Rgb, TREE_PALETTE};

// ════════════════════════════════════════════════════════════════════════════
// ShapeError
// ════════════════════════════════════════════════════════════════════════════

/// Errors raised while preparing shape inputs.
#[derive(Debug)]
pub enum ShapeError {
    /// A color string was neither `#rrggbb` nor a palette name.
    InvalidColor(String),
    /// Font bytes could not be parsed as TrueType/OpenType.
    FontLoad,
    /// A font file could not be read from disk.
    FontRead(std::io::Error),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::InvalidColor(s) => write!(f, "invalid color {:?} (expected #rrggbb or a palette name)", s),
            ShapeError::FontLoad        => write!(f, "font data is not a valid TrueType/OpenType font"),
            ShapeError::FontRead(e)     => write!(f, "failed to read font file: {}", e),
        }
    }
}

impl std::error::Error for ShapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShapeError::FontRead(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ShapeError {
    fn from(e: std::io::Error) -> Self { ShapeError::FontRead(e) }
}

/// Number of whole points in a flat `x, y, z` buffer.
pub fn point_count(flat: &[f32]) -> usize { flat.len() / 3 }
