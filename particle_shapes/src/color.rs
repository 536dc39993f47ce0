//! Linear-ish RGB triples and the named tree palette.
//!
//! Channels are plain `f32` in `0.0..=1.0` for palette colors, but the
//! particle field happily carries values above 1.0 (the "hot white" flash),
//! so nothing here clamps on construction.

use std::fmt;
use std::str::FromStr;

use crate::ShapeError;

// ════════════════════════════════════════════════════════════════════════════
// Rgb
// ════════════════════════════════════════════════════════════════════════════

/// A color as three float channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self { Rgb { r, g, b } }

    /// Same value in every channel.
    pub const fn splat(v: f32) -> Self { Rgb { r: v, g: v, b: v } }

    /// Parse `#rrggbb` (the leading `#` is optional). Bytes map to `/255`.
    pub fn from_hex(s: &str) -> Result<Self, ShapeError> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ShapeError::InvalidColor(s.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ShapeError::InvalidColor(s.to_string()))
        };
        Ok(Rgb::from_bytes(byte(0)?, byte(2)?, byte(4)?))
    }

    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Channels clamped into `0.0..=1.0`.
    pub fn clamped(self) -> Self {
        Rgb::new(self.r.clamp(0.0, 1.0), self.g.clamp(0.0, 1.0), self.b.clamp(0.0, 1.0))
    }

    pub fn to_array(self) -> [f32; 3] { [self.r, self.g, self.b] }

    /// `#rrggbb`, clamping out-of-range channels.
    pub fn to_hex(self) -> String {
        let c = self.clamped();
        let q = |v: f32| (v * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", q(c.r), q(c.g), q(c.b))
    }

    /// Resolve a palette name (case-insensitive) or a hex string.
    pub fn parse_named(s: &str) -> Result<Self, ShapeError> {
        match palette_lookup(s) {
            Some(entry) => Rgb::from_hex(entry.hex),
            None        => Rgb::from_hex(s),
        }
    }
}

impl FromStr for Rgb {
    type Err = ShapeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Rgb::parse_named(s) }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tree palette
// ════════════════════════════════════════════════════════════════════════════

/// A named tree color offered to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: &'static str,
    pub hex:  &'static str,
}

/// The five tree colors, in picker order. Green is the default.
pub const TREE_PALETTE: [PaletteEntry; 5] = [
    PaletteEntry { name: "Green",  hex: "#80ffaa" },
    PaletteEntry { name: "Silver", hex: "#e0e6ed" },
    PaletteEntry { name: "Gold",   hex: "#ffcc00" },
    PaletteEntry { name: "Blue",   hex: "#88ccff" },
    PaletteEntry { name: "Purple", hex: "#cc88ff" },
];

/// Find a palette entry by name, ignoring case.
pub fn palette_lookup(name: &str) -> Option<&'static PaletteEntry> {
    let name = name.trim();
    TREE_PALETTE.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

/// Palette color at `index` (wrapping), already parsed.
pub fn palette_color(index: usize) -> Rgb {
    let entry = &TREE_PALETTE[index % TREE_PALETTE.len()];
    Rgb::from_hex(entry.hex).unwrap_or(Rgb::splat(1.0))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
