//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┬────────────┐
//! │                                                  │  HAND      │
//! │                                                  │  (inset)   │
//! │            particle cloud                        └────────────┤
//! │            (perspective, additive, tone-mapped)               │
//! │                                                               │
//! │  status line                                                  │
//! │  key legend                                                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles are splatted additively into a floating-point accumulation
//! buffer and Reinhard tone-mapped, so the overdriven white used for the
//! text flash blooms instead of clipping.

use std::f32::consts::{PI, TAU};
use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use morph_field::MorphMode;
use particle_shapes::color::{palette_color, TREE_PALETTE};

use crate::classifier::{GestureEvent, GestureKind};
use crate::engine::{ApplicationState, Command};
use crate::gesture::{SimInput, SimPose};
use crate::landmarks::{LandmarkFrame, HAND_CONNECTIONS};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 1024;
pub const WIN_H:    usize = 640;
const INSET_W:      usize = 200;
const INSET_H:      usize = 150;
const INSET_X:      usize = WIN_W - INSET_W - 12;
const INSET_Y:      usize = 12;
const STATUS_Y:     usize = WIN_H - 40;
const LABEL_SCALE:  usize = 2;

const BG_LINEAR:    [f32; 3] = [2.0 / 255.0, 4.0 / 255.0, 8.0 / 255.0];
const INSET_BG:     u32 = 0xFF0A0F18;
const INSET_BORDER: u32 = 0xFF2A3A50;
const BONE_COLOR:   u32 = 0xFF00FF66;
const JOINT_COLOR:  u32 = 0xFFFF3355;

// ── camera ──────────────────────────────────────────────────────────────────

/// Camera distance from the cloud's pivot (world units).
const CAMERA_DIST:  f32 = 80.0;
/// Points closer than this to the eye are dropped.
const NEAR:         f32 = 1.0;
/// Focal length in pixels.
const FOCAL:        f32 = WIN_H as f32 * 0.95;
/// World y that lands on the screen center.
const VIEW_CENTER_Y: f32 = -10.0;
/// Exposure applied before tone-mapping.
const EXPOSURE:     f32 = 1.6;

// ════════════════════════════════════════════════════════════════════════════
// CloudTransform — cosmetic motion owned by the renderer
// ════════════════════════════════════════════════════════════════════════════

/// Whole-cloud rotation, breathing scale and point opacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudTransform {
    /// Radians about the vertical axis, kept in `[-π, π)`.
    pub rotation_y: f32,
    pub scale:      f32,
    pub opacity:    f32,
}

impl Default for CloudTransform {
    fn default() -> Self {
        CloudTransform { rotation_y: 0.0, scale: 1.0, opacity: 0.9 }
    }
}

impl CloudTransform {
    /// The tree spins while powered; text faces the viewer.
    pub fn update(&mut self, dt: f32, elapsed_secs: f32, state: &ApplicationState) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match state.morph_mode {
            MorphMode::Tree if state.power_on => {
                self.rotation_y = wrap_angle(self.rotation_y + 0.3 * dt);
            }
            MorphMode::Tree => {}
            MorphMode::Text => {
                self.rotation_y -= self.rotation_y * (2.0 * dt).min(1.0);
            }
        }

        let base = if state.morph_mode == MorphMode::Text { 1.2 } else { 1.0 };
        let target = base * (0.98 + 0.01 * (0.8 * elapsed_secs).sin());
        self.scale += (target - self.scale) * 0.1;

        self.opacity = if state.power_on { 0.9 } else { 0.4 };
    }
}

fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

/// World point → `(screen_x, screen_y, depth)`, or `None` behind the near
/// plane.
pub fn project(p: [f32; 3], t: &CloudTransform) -> Option<(f32, f32, f32)> {
    let (s, c) = t.rotation_y.sin_cos();
    let x = (p[0] * c + p[2] * s) * t.scale;
    let z = (-p[0] * s + p[2] * c) * t.scale;
    let y = (p[1] - VIEW_CENTER_Y) * t.scale;
    let depth = CAMERA_DIST - z;
    if !(depth >= NEAR) {
        return None;
    }
    Some((
        WIN_W as f32 * 0.5 + FOCAL * x / depth,
        WIN_H as f32 * 0.5 - FOCAL * y / depth,
        depth,
    ))
}

/// Additively splat every particle into `accum` (`WIN_W × WIN_H`).
/// Each point lights its pixel fully and the four neighbours at a quarter.
pub fn splat_points(accum: &mut [[f32; 3]], positions: &[f32], colors: &[f32], t: &CloudTransform) {
    const SPREAD: [(isize, isize, f32); 5] =
        [(0, 0, 1.0), (1, 0, 0.25), (-1, 0, 0.25), (0, 1, 0.25), (0, -1, 0.25)];

    for (p, c) in positions.chunks_exact(3).zip(colors.chunks_exact(3)) {
        let Some((sx, sy, _)) = project([p[0], p[1], p[2]], t) else { continue };
        if !(sx.is_finite() && sy.is_finite()) {
            continue;
        }
        let (px, py) = (sx.round() as isize, sy.round() as isize);
        for &(dx, dy, w) in &SPREAD {
            let (x, y) = (px + dx, py + dy);
            if x < 0 || y < 0 || x >= WIN_W as isize || y >= WIN_H as isize {
                continue;
            }
            let cell = &mut accum[y as usize * WIN_W + x as usize];
            let k = w * t.opacity;
            cell[0] += c[0] * k;
            cell[1] += c[1] * k;
            cell[2] += c[2] * k;
        }
    }
}

/// Reinhard tone-map of one linear channel to 8 bits.
pub fn tone_map(c: f32) -> u8 {
    let v = (c * EXPOSURE).max(0.0);
    if !v.is_finite() {
        return 255;
    }
    ((v / (1.0 + v)) * 255.0).round() as u8
}

fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Everything drawn in one frame.
pub struct Scene<'a> {
    pub positions: &'a [f32],
    pub colors:    &'a [f32],
    pub transform: CloudTransform,
    pub landmarks: Option<&'a LandmarkFrame>,
    pub gesture:   Option<&'a GestureEvent>,
    pub status:    &'a str,
}

pub struct Visualizer {
    window:       Window,
    buf:          Vec<u32>,
    accum:        Vec<[f32; 3]>,
    sim_tx:       Sender<SimInput>,
    hand_visible: bool,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Gesture Morph",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![0; WIN_W * WIN_H],
            accum: vec![BG_LINEAR; WIN_W * WIN_H],
            sim_tx,
            hand_visible: true,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Read the keyboard and mouse: UI keys become [`Command`]s, the mouse
    /// and pose keys drive the simulated hand. Returns false to quit.
    pub fn poll_input(&mut self, commands: &mut Vec<Command>) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| self.window.is_key_down(k);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            return false;
        }
        if one_shot(Key::Space) { commands.push(Command::TogglePower); }
        if one_shot(Key::M)     { commands.push(Command::ToggleMode); }

        let palette_keys = [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5];
        for (i, &k) in palette_keys.iter().enumerate().take(TREE_PALETTE.len()) {
            if one_shot(k) {
                commands.push(Command::SetTreeColor(palette_color(i)));
            }
        }

        let toggle_hand = one_shot(Key::H);
        let pull        = one_shot(Key::L);

        let pose = if held(Key::C) {
            SimPose::Curled
        } else if held(Key::P) || self.window.get_mouse_down(MouseButton::Left) {
            SimPose::Pinch
        } else if held(Key::O) || self.window.get_mouse_down(MouseButton::Right) {
            SimPose::Open
        } else {
            SimPose::Relaxed
        };
        let pointer = self
            .window
            .get_mouse_pos(MouseMode::Clamp)
            .map(|(x, y)| (x / WIN_W as f32, y / WIN_H as f32))
            .unwrap_or((0.5, 0.5));

        if toggle_hand {
            self.hand_visible = !self.hand_visible;
        }

        let input = if !self.hand_visible {
            SimInput::NoHand
        } else if pull {
            SimInput::PinchPull { pointer }
        } else {
            SimInput::Hand { pose, pointer }
        };
        // Nobody listens when a hardware source is active.
        let _ = self.sim_tx.send(input);

        true
    }

    /// Render one frame.
    pub fn render(&mut self, scene: &Scene<'_>) {
        // ── Particles ─────────────────────────────────────────────────────
        self.accum.fill(BG_LINEAR);
        splat_points(&mut self.accum, scene.positions, scene.colors, &scene.transform);
        for (dst, c) in self.buf.iter_mut().zip(self.accum.iter()) {
            *dst = pack_rgb(tone_map(c[0]), tone_map(c[1]), tone_map(c[2]));
        }

        // ── Hand inset ────────────────────────────────────────────────────
        self.draw_inset(scene.landmarks, scene.gesture);

        // ── Status + legend ───────────────────────────────────────────────
        self.draw_label(scene.status, 12, STATUS_Y, 0xFFEEEEEE);
        self.draw_label(
            "MOUSE=HAND  P/LMB=PINCH  O/RMB=OPEN  C=CURL  L=PULL  H=HIDE  SPACE=POWER  M=MODE  1-5=COLOR  Q=QUIT",
            12, STATUS_Y + 16, 0xFF778899,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Hand inset ────────────────────────────────────────────────────────

    fn draw_inset(&mut self, landmarks: Option<&LandmarkFrame>, gesture: Option<&GestureEvent>) {
        self.fill_rect(INSET_X, INSET_Y, INSET_W, INSET_H, INSET_BG);
        self.draw_border(INSET_X, INSET_Y, INSET_W, INSET_H, INSET_BORDER);

        // mirrored, like a selfie preview
        let to_inset = |x: f32, y: f32| -> (isize, isize) {
            (
                INSET_X as isize + ((1.0 - x) * INSET_W as f32) as isize,
                INSET_Y as isize + (y * INSET_H as f32) as isize,
            )
        };

        match landmarks {
            Some(frame) => {
                let pts = frame.points();
                for &(a, b) in HAND_CONNECTIONS.iter() {
                    let (x0, y0) = to_inset(pts[a].x, pts[a].y);
                    let (x1, y1) = to_inset(pts[b].x, pts[b].y);
                    self.draw_line_clipped(x0, y0, x1, y1, BONE_COLOR);
                }
                for p in pts.iter() {
                    let (x, y) = to_inset(p.x, p.y);
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            self.set_pixel_in_inset(x + dx, y + dy, JOINT_COLOR);
                        }
                    }
                }
            }
            None => self.draw_label("NO HAND", INSET_X + 60, INSET_Y + INSET_H / 2 - 5, 0xFF556677),
        }

        if let Some(g) = gesture {
            let color = match g.kind {
                GestureKind::Pinch => 0xFFFF8844,
                GestureKind::Open  => 0xFF44FF88,
                GestureKind::Idle  => 0xFFAAAAAA,
            };
            self.draw_label(g.kind.as_str(), INSET_X, INSET_Y + INSET_H + 6, color);
        }
    }

    fn set_pixel_in_inset(&mut self, x: isize, y: isize, color: u32) {
        let inside = x >= INSET_X as isize
            && y >= INSET_Y as isize
            && x < (INSET_X + INSET_W) as isize
            && y < (INSET_Y + INSET_H) as isize;
        if inside {
            self.buf[y as usize * WIN_W + x as usize] = color;
        }
    }

    /// Bresenham line, clipped to the inset.
    fn draw_line_clipped(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel_in_inset(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// 3×5 bitmap font drawn at `LABEL_SCALE`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let s = LABEL_SCALE;
        let mut cx = x;
        for ch in text.chars() {
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        for k in 0..s * s {
                            self.set_pixel(cx + col * s + k % s, y + row * s + k / s, color);
                        }
                    }
                }
            }
            cx += 4 * s;
            if cx + 4 * s > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
