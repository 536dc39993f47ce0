//! Text → point cloud.
//!
//! The text is drawn onto an off-screen coverage canvas (fill plus a thick
//! stroke so thin strokes still catch samples), then the canvas is scanned
//! on a fixed pixel stride. Every bright sample becomes one point on the
//! `z = 0` plane, scaled into the requested bounds:
//!
//! ```text
//!   x' =  (x / W - 0.5) · bounds_width
//!   y' = -(y / H - 0.5) · bounds_height
//! ```
//!
//! The number of points depends on how much ink the text produces; callers
//! must cope with fewer or more points than they have particles.

use std::path::Path;

use log::debug;
use rusttype::{point, Font, Scale};

use crate::ShapeError;

static DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

// ════════════════════════════════════════════════════════════════════════════
// RasterLayout — fixed design constants of the off-screen canvas
// ════════════════════════════════════════════════════════════════════════════

/// Canvas geometry and sampling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterLayout {
    pub width:        usize,
    pub height:       usize,
    /// Glyph size in canvas pixels.
    pub font_px:      f32,
    /// Distance between consecutive line centers.
    pub line_spacing: f32,
    /// Total stroke width drawn around each glyph outline.
    pub stroke_width: f32,
    /// Scan every `stride`-th pixel on both axes.
    pub stride:       usize,
    /// A sample is ink when its coverage byte is strictly above this.
    pub threshold:    u8,
}

impl Default for RasterLayout {
    fn default() -> Self {
        RasterLayout {
            width:        2048,
            height:       1024,
            font_px:      180.0,
            line_spacing: 200.0,
            stroke_width: 15.0,
            stride:       4,
            threshold:    64,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Coverage — the rasterized canvas
// ════════════════════════════════════════════════════════════════════════════

/// Single-channel coverage canvas (0 = background, 255 = full ink).
#[derive(Clone, Debug)]
pub struct Coverage {
    pub width:  usize,
    pub height: usize,
    pub data:   Vec<u8>,
    /// Inclusive pixel bounds of any non-zero coverage, if there is ink.
    ink_bounds: Option<(usize, usize, usize, usize)>,
}

impl Coverage {
    fn blank(width: usize, height: usize) -> Self {
        Coverage { width, height, data: vec![0; width * height], ink_bounds: None }
    }

    pub fn at(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height { self.data[y * self.width + x] } else { 0 }
    }

    /// Max-blend `value` into one pixel; out-of-canvas writes are dropped.
    fn plot(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || value == 0 { return; }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height { return; }
        let idx = y * self.width + x;
        if value > self.data[idx] { self.data[idx] = value; }
        self.ink_bounds = Some(match self.ink_bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    pub fn has_ink(&self) -> bool { self.ink_bounds.is_some() }

    /// Stroked luminance at a pixel: the brightest fill coverage within the
    /// stroke disk around it. Stops early once `threshold` is exceeded.
    fn stroked_above(&self, x: usize, y: usize, disk: &[(i32, i32)], threshold: u8) -> bool {
        if self.at(x, y) > threshold { return true; }
        disk.iter().any(|&(dx, dy)| {
            let sx = x as i32 + dx;
            let sy = y as i32 + dy;
            sx >= 0 && sy >= 0 && self.at(sx as usize, sy as usize) > threshold
        })
    }
}

/// Integer offsets inside a disk of `radius`, nearest first.
fn disk_offsets(radius: f32) -> Vec<(i32, i32)> {
    let r = radius.max(0.0);
    let ri = r.ceil() as i32;
    let mut out = Vec::new();
    for dy in -ri..=ri {
        for dx in -ri..=ri {
            if (dx, dy) != (0, 0) && (dx * dx + dy * dy) as f32 <= r * r {
                out.push((dx, dy));
            }
        }
    }
    out.sort_by_key(|&(dx, dy)| dx * dx + dy * dy);
    out
}

// ════════════════════════════════════════════════════════════════════════════
// GlyphSampler
// ════════════════════════════════════════════════════════════════════════════

/// Rasterizes text with one font and turns it into sample points.
pub struct GlyphSampler {
    font:   Font<'static>,
    layout: RasterLayout,
}

impl GlyphSampler {
    /// Sampler using the bundled font.
    pub fn new() -> Result<Self, ShapeError> {
        let font = Font::try_from_bytes(DEFAULT_FONT).ok_or(ShapeError::FontLoad)?;
        Ok(GlyphSampler { font, layout: RasterLayout::default() })
    }

    /// Sampler from caller-provided TrueType/OpenType bytes.
    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self, ShapeError> {
        let font = Font::try_from_vec(bytes).ok_or(ShapeError::FontLoad)?;
        Ok(GlyphSampler { font, layout: RasterLayout::default() })
    }

    pub fn from_font_file(path: &Path) -> Result<Self, ShapeError> {
        Self::from_font_bytes(std::fs::read(path)?)
    }

    pub fn with_layout(mut self, layout: RasterLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &RasterLayout { &self.layout }

    /// Draw `text` (lines split on `\n`) centered on the canvas.
    pub fn rasterize(&self, text: &str) -> Coverage {
        let l = &self.layout;
        let mut canvas = Coverage::blank(l.width, l.height);
        let scale = Scale::uniform(l.font_px);
        let vm = self.font.v_metrics(scale);

        let lines: Vec<&str> = text.split('\n').map(|s| s.trim_end_matches('\r')).collect();
        let start_y = l.height as f32 / 2.0 - (lines.len() - 1) as f32 * l.line_spacing / 2.0;

        for (i, line) in lines.iter().enumerate() {
            let center_y = start_y + i as f32 * l.line_spacing;
            // middle of the em box sits on the line center
            let baseline = center_y + (vm.ascent + vm.descent) / 2.0;
            let width = self.line_width(line, scale);
            let origin = point(l.width as f32 / 2.0 - width / 2.0, baseline);

            for glyph in self.font.layout(line, scale, origin) {
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, v| {
                        let value = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                        canvas.plot(bb.min.x + gx as i32, bb.min.y + gy as i32, value);
                    });
                }
            }
        }
        canvas
    }

    /// Sample `text` into flat `x, y, 0` triples inside
    /// `[-w/2, w/2] × [-h/2, h/2]`. Deterministic for equal inputs.
    pub fn sample(&self, text: &str, bounds_width: f32, bounds_height: f32) -> Vec<f32> {
        let l = &self.layout;
        let canvas = self.rasterize(text);
        let (x0, y0, x1, y1) = match canvas.ink_bounds {
            Some(b) => b,
            None => {
                debug!("glyph sample of {:?}: no ink", text);
                return Vec::new();
            }
        };

        let radius = l.stroke_width / 2.0;
        let disk = disk_offsets(radius);
        let reach = radius.ceil() as usize;
        let (min_x, min_y) = (x0.saturating_sub(reach), y0.saturating_sub(reach));
        let (max_x, max_y) = (x1 + reach, y1 + reach);
        let stride = l.stride.max(1);
        let (w, h) = (l.width as f32, l.height as f32);

        let mut coords = Vec::new();
        for y in (0..l.height).step_by(stride) {
            if y < min_y || y > max_y { continue; }
            for x in (0..l.width).step_by(stride) {
                if x < min_x || x > max_x { continue; }
                if canvas.stroked_above(x, y, &disk, l.threshold) {
                    coords.push((x as f32 / w - 0.5) * bounds_width);
                    coords.push(-(y as f32 / h - 0.5) * bounds_height);
                    coords.push(0.0);
                }
            }
        }
        debug!("glyph sample of {:?}: {} points", text, coords.len() / 3);
        coords
    }

    fn line_width(&self, line: &str, scale: Scale) -> f32 {
        self.font
            .layout(line, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
