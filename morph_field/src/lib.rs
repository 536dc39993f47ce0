//! # morph_field
//!
//! Owns the live particle buffers of the morph display and animates them
//! between two target shapes, the cone "tree" and a sampled text cloud,
//! through a two-phase transition.
//!
//! ## Transition
//!
//! | Call / event | Phase after | Targets |
//! |---|---|---|
//! | construction | `Steady` | tree (current = target) |
//! | [`ParticleMorphField::set_mode`] | `Exploding` | random shell, radius 30–60 |
//! | explode delay elapsed (in `tick`) | `Assembling` | text points or home tree |
//! | every coordinate within `settle_epsilon` | `Steady` | unchanged |
//!
//! A newer `set_mode` replaces the pending assemble, so only the last
//! requested mode ever assembles.
//!
//! ## Integration
//!
//! Every [`ParticleMorphField::tick`] moves each coordinate and color channel
//! a fraction `min(1, rate·dt)` of the way toward its target (`rate` = 2.0
//! while exploding, 3.0 otherwise): exponential decay, monotone per
//! particle for a fixed target.
//!
//! The field is the single writer of its buffers. Everyone else gets
//! read-only slices.

use std::f32::consts::TAU;

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use particle_shapes::{tree, Rgb};

// ════════════════════════════════════════════════════════════════════════════
// MorphMode / MorphPhase
// ════════════════════════════════════════════════════════════════════════════

/// Which shape the field converges toward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MorphMode {
    #[default]
    Tree,
    Text,
}

impl MorphMode {
    pub fn toggled(self) -> Self {
        match self {
            MorphMode::Tree => MorphMode::Text,
            MorphMode::Text => MorphMode::Tree,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MorphMode::Tree => "TREE",
            MorphMode::Text => "TEXT",
        }
    }
}

/// Sub-state of a mode transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MorphPhase {
    /// Current ≈ target; at rest.
    #[default]
    Steady,
    /// Particles flying out toward the explosion shell.
    Exploding,
    /// Particles converging on the new shape.
    Assembling,
}

// ════════════════════════════════════════════════════════════════════════════
// FieldConfig
// ════════════════════════════════════════════════════════════════════════════

/// Tunables of the particle field. Defaults reproduce the reference look.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldConfig {
    /// Fixed particle count N; buffers hold `3·N` floats.
    pub particle_count:   usize,
    /// Time between `set_mode` and the assemble step.
    pub explode_delay_ms: u64,
    /// Approach rate (per second) while exploding.
    pub explode_rate:     f32,
    /// Approach rate (per second) while assembling or at rest.
    pub assemble_rate:    f32,
    /// Explosion shell radius range.
    pub shell_min:        f32,
    pub shell_max:        f32,
    /// Where particles without a text point are parked.
    pub sentinel:         [f32; 3],
    /// Text target bounds (world units).
    pub text_width:       f32,
    pub text_height:      f32,
    /// Color overshoot used for the text flash.
    pub hot_white:        f32,
    /// Max per-coordinate deviation at which assembling counts as settled.
    pub settle_epsilon:   f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            particle_count:   15_000,
            explode_delay_ms: 800,
            explode_rate:     2.0,
            assemble_rate:    3.0,
            shell_min:        30.0,
            shell_max:        60.0,
            sentinel:         [0.0, -200.0, 0.0],
            text_width:       40.0,
            text_height:      20.0,
            hot_white:        4.0,
            settle_epsilon:   1e-3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingAssemble {
    mode:   MorphMode,
    due_ms: u64,
}

/// Keep `n` of the `x, y, z` triples in `points`, picked at even index
/// steps in their original order. Shorter inputs are returned unchanged.
pub fn thin_evenly(points: Vec<f32>, n: usize) -> Vec<f32> {
    let k = points.len() / 3;
    if k <= n {
        return points;
    }
    (0..n)
        .flat_map(|i| {
            let j = i * k / n;
            [points[3 * j], points[3 * j + 1], points[3 * j + 2]]
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleMorphField
// ════════════════════════════════════════════════════════════════════════════

/// The live particle buffers plus the explode/assemble state machine.
///
/// Time is always passed in as milliseconds on the caller's clock, so the
/// field never reads a wall clock itself.
pub struct ParticleMorphField<R: Rng = StdRng> {
    config: FieldConfig,
    rng:    R,

    // ── shape sources ────────────────────────────────────────────────────
    /// Tree positions generated at construction; restored on every return
    /// to `Tree` so the shape does not change twice.
    home:   Vec<f32>,
    /// Latest sampled text points (any length, multiple of 3).
    text:   Vec<f32>,
    tree_color: Rgb,

    // ── buffers (3·N each) ───────────────────────────────────────────────
    current_positions: Vec<f32>,
    current_colors:    Vec<f32>,
    target_positions:  Vec<f32>,
    target_colors:     Vec<f32>,

    // ── state machine ────────────────────────────────────────────────────
    mode:             MorphMode,
    phase:            MorphPhase,
    phase_started_ms: u64,
    pending:          Option<PendingAssemble>,
}

impl ParticleMorphField<StdRng> {
    /// Field seeded from OS entropy.
    pub fn new(config: FieldConfig, tree_color: Rgb) -> Self {
        Self::with_rng(config, tree_color, StdRng::from_entropy())
    }

    /// Field with a reproducible random stream.
    pub fn seeded(config: FieldConfig, tree_color: Rgb, seed: u64) -> Self {
        Self::with_rng(config, tree_color, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ParticleMorphField<R> {
    pub fn with_rng(config: FieldConfig, tree_color: Rgb, mut rng: R) -> Self {
        let sample = tree::generate(config.particle_count, tree_color, &mut rng);
        ParticleMorphField {
            home:              sample.positions.clone(),
            text:              Vec::new(),
            tree_color,
            current_positions: sample.positions.clone(),
            current_colors:    sample.colors.clone(),
            target_positions:  sample.positions,
            target_colors:     sample.colors,
            mode:              MorphMode::Tree,
            phase:             MorphPhase::Steady,
            phase_started_ms:  0,
            pending:           None,
            config,
            rng,
        }
    }

    // ── commands ─────────────────────────────────────────────────────────

    /// Start a transition toward `mode`: explode now, assemble after
    /// `explode_delay_ms`. Replaces any assemble still pending.
    pub fn set_mode(&mut self, mode: MorphMode, now_ms: u64) {
        if let Some(old) = self.pending {
            debug!("morph: pending {} assemble superseded", old.mode.name());
        }
        self.mode = mode;
        self.enter(MorphPhase::Exploding, now_ms);

        match mode {
            MorphMode::Text => self.target_colors.fill(self.config.hot_white),
            MorphMode::Tree => self.regenerate_tree_colors(),
        }
        self.scatter_to_shell();

        self.pending = Some(PendingAssemble {
            mode,
            due_ms: now_ms.saturating_add(self.config.explode_delay_ms),
        });
    }

    /// New base tree color. Live-updates target colors while in `Tree`
    /// mode without touching the phase.
    pub fn set_tree_color(&mut self, color: Rgb) {
        self.tree_color = color;
        if self.mode == MorphMode::Tree {
            self.regenerate_tree_colors();
        }
    }

    /// Replace the text target. While showing text, the new text morphs in
    /// through a fresh explode/assemble.
    ///
    /// More points than particles are thinned evenly over the whole cloud,
    /// so every line of a multi-line text keeps some particles.
    pub fn set_text_points(&mut self, points: Vec<f32>, now_ms: u64) {
        self.text = thin_evenly(points, self.config.particle_count);
        if self.mode == MorphMode::Text {
            self.set_mode(MorphMode::Text, now_ms);
        }
    }

    /// Advance one animation frame: fire a due assemble, then pull every
    /// coordinate and channel toward its target.
    pub fn tick(&mut self, dt_secs: f32, now_ms: u64) {
        if let Some(p) = self.pending {
            if now_ms >= p.due_ms {
                self.pending = None;
                self.assemble(p.mode, now_ms);
            }
        }

        let rate = match self.phase {
            MorphPhase::Exploding => self.config.explode_rate,
            _                     => self.config.assemble_rate,
        };
        let dt = if dt_secs.is_finite() { dt_secs.max(0.0) } else { 0.0 };
        let f = (rate * dt).min(1.0);

        let pos_dev = approach(&mut self.current_positions, &self.target_positions, f);
        let col_dev = approach(&mut self.current_colors, &self.target_colors, f);

        if self.phase == MorphPhase::Assembling
            && pos_dev.max(col_dev) < self.config.settle_epsilon
        {
            self.enter(MorphPhase::Steady, now_ms);
        }
    }

    // ── internals ────────────────────────────────────────────────────────

    fn enter(&mut self, phase: MorphPhase, now_ms: u64) {
        if self.phase != phase {
            debug!("morph: {:?} → {:?} ({}) at {} ms", self.phase, phase, self.mode.name(), now_ms);
        }
        self.phase = phase;
        self.phase_started_ms = now_ms;
    }

    fn regenerate_tree_colors(&mut self) {
        let fresh = tree::tree_colors(self.config.particle_count, self.tree_color, &mut self.rng);
        self.target_colors.copy_from_slice(&fresh);
    }

    /// Independent random point on a shell per particle.
    fn scatter_to_shell(&mut self) {
        let (lo, hi) = (self.config.shell_min, self.config.shell_max);
        for p in self.target_positions.chunks_exact_mut(3) {
            let theta = self.rng.gen::<f32>() * TAU;
            let phi   = (self.rng.gen::<f32>() * 2.0 - 1.0).clamp(-1.0, 1.0).acos();
            let r     = lo + self.rng.gen::<f32>() * (hi - lo);
            p[0] = phi.sin() * theta.cos() * r;
            p[1] = phi.sin() * theta.sin() * r;
            p[2] = phi.cos() * r;
        }
    }

    fn assemble(&mut self, mode: MorphMode, now_ms: u64) {
        self.enter(MorphPhase::Assembling, now_ms);
        match mode {
            MorphMode::Tree => self.target_positions.copy_from_slice(&self.home),
            MorphMode::Text => {
                let sentinel = self.config.sentinel;
                let mut text = self.text.chunks_exact(3);
                for p in self.target_positions.chunks_exact_mut(3) {
                    match text.next() {
                        Some(t) => p.copy_from_slice(t),
                        None    => p.copy_from_slice(&sentinel),
                    }
                }
                let placed = (self.text.len() / 3).min(self.config.particle_count);
                debug!("morph: text assemble, {} placed, {} parked",
                       placed, self.config.particle_count - placed);
            }
        }
    }

    // ── read-only views for the renderer ─────────────────────────────────

    pub fn positions(&self)     -> &[f32]      { &self.current_positions }
    pub fn colors(&self)        -> &[f32]      { &self.current_colors }
    pub fn targets(&self)       -> &[f32]      { &self.target_positions }
    pub fn target_colors(&self) -> &[f32]      { &self.target_colors }
    pub fn home(&self)          -> &[f32]      { &self.home }
    pub fn mode(&self)          -> MorphMode   { self.mode }
    pub fn phase(&self)         -> MorphPhase  { self.phase }
    pub fn phase_started_ms(&self) -> u64      { self.phase_started_ms }
    pub fn tree_color(&self)    -> Rgb         { self.tree_color }
    pub fn config(&self)        -> &FieldConfig { &self.config }
    pub fn particle_count(&self) -> usize      { self.config.particle_count }

    /// When the pending assemble fires, if one is scheduled.
    pub fn pending_assemble_ms(&self) -> Option<u64> { self.pending.map(|p| p.due_ms) }

    /// Largest per-coordinate distance between current and target positions.
    pub fn max_deviation(&self) -> f32 {
        self.current_positions.iter()
            .zip(&self.target_positions)
            .map(|(c, t)| (t - c).abs())
            .fold(0.0, f32::max)
    }
}

/// `current += (target - current)·f` element-wise; returns the largest
/// remaining absolute difference.
fn approach(current: &mut [f32], target: &[f32], f: f32) -> f32 {
    let mut max_dev = 0.0f32;
    for (c, t) in current.iter_mut().zip(target) {
        *c += (t - *c) * f;
        max_dev = max_dev.max((t - *c).abs());
    }
    max_dev
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 400;

    fn field() -> ParticleMorphField {
        let cfg = FieldConfig { particle_count: N, ..FieldConfig::default() };
        ParticleMorphField::seeded(cfg, Rgb::from_hex("#80ffaa").unwrap(), 42)
    }

    /// A small grid of text points, fewer than N.
    fn text_points(k: usize) -> Vec<f32> {
        (0..k).flat_map(|i| [i as f32 * 0.1 - 5.0, 1.0, 0.0]).collect()
    }

    fn is_sentinel(p: &[f32]) -> bool { p == [0.0, -200.0, 0.0] }

    #[test]
    fn starts_steady_on_tree() {
        let f = field();
        assert_eq!(f.phase(), MorphPhase::Steady);
        assert_eq!(f.mode(), MorphMode::Tree);
        assert_eq!(f.positions(), f.targets());
        assert_eq!(f.targets(), f.home());
        assert_eq!(f.positions().len(), 3 * N);
        assert_eq!(f.colors().len(), 3 * N);
    }

    #[test]
    fn set_mode_explodes_onto_shell() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        assert_eq!(f.phase(), MorphPhase::Exploding);
        for p in f.targets().chunks_exact(3) {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((29.99..=60.01).contains(&r), "r = {}", r);
        }
        assert!(f.target_colors().iter().all(|&c| c == 4.0));
        assert_eq!(f.pending_assemble_ms(), Some(800));
    }

    #[test]
    fn assemble_waits_for_delay() {
        let mut f = field();
        f.set_text_points(text_points(50), 0);
        f.set_mode(MorphMode::Text, 1_000);
        f.tick(1.0 / 60.0, 1_799);
        assert_eq!(f.phase(), MorphPhase::Exploding);
        f.tick(1.0 / 60.0, 1_800);
        assert_eq!(f.phase(), MorphPhase::Assembling);
        assert_eq!(f.pending_assemble_ms(), None);
    }

    #[test]
    fn text_assemble_places_then_parks() {
        let mut f = field();
        let text = text_points(50);
        f.set_text_points(text.clone(), 0);
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800);
        let targets: Vec<&[f32]> = f.targets().chunks_exact(3).collect();
        for (i, p) in targets.iter().enumerate() {
            if i < 50 {
                assert_eq!(*p, &text[i * 3..i * 3 + 3]);
            } else {
                assert!(is_sentinel(p));
            }
        }
    }

    #[test]
    fn oversupplied_text_fills_every_particle() {
        let mut f = field();
        f.set_text_points(text_points(N * 2), 0);
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800);
        assert_eq!(f.targets().len(), 3 * N);
        assert!(!f.targets().chunks_exact(3).any(is_sentinel));
    }

    #[test]
    fn oversupplied_text_keeps_its_tail() {
        // rows at y = 0, 1, 2 in scan order; the last row must still be placed
        let rows: Vec<f32> = (0..3 * N)
            .flat_map(|i| [(i % N) as f32 * 0.01, (i / N) as f32, 0.0])
            .collect();
        let mut f = field();
        f.set_text_points(rows, 0);
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800);
        let per_row = |y: f32| f.targets().chunks_exact(3).filter(|p| p[1] == y).count();
        assert_eq!(per_row(0.0) + per_row(1.0) + per_row(2.0), N);
        assert!(per_row(2.0) >= N / 3 - 1);
    }

    #[test]
    fn thinning_is_ordered_and_leaves_short_input_alone() {
        let short = text_points(10);
        assert_eq!(thin_evenly(short.clone(), 20), short);
        let thin = thin_evenly(text_points(100), 10);
        assert_eq!(thin.len(), 30);
        let xs: Vec<f32> = thin.chunks_exact(3).map(|p| p[0]).collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xs[0], -5.0);
    }

    #[test]
    fn empty_text_parks_everything() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800);
        assert!(f.targets().chunks_exact(3).all(is_sentinel));
    }

    #[test]
    fn superseded_mode_never_assembles() {
        let mut f = field();
        f.set_text_points(text_points(50), 0);
        f.set_mode(MorphMode::Text, 0);
        f.set_mode(MorphMode::Tree, 100);
        assert_eq!(f.pending_assemble_ms(), Some(900));

        let mut now = 100;
        while now < 3_000 {
            now += 16;
            f.tick(0.016, now);
            assert!(!f.targets().chunks_exact(3).any(is_sentinel),
                    "text target leaked at {} ms", now);
        }
        assert_eq!(f.mode(), MorphMode::Tree);
        assert_eq!(f.targets(), f.home());
    }

    #[test]
    fn rapid_set_mode_keeps_single_deadline() {
        let mut f = field();
        for i in 0..100u64 {
            let mode = if i % 2 == 0 { MorphMode::Text } else { MorphMode::Tree };
            f.set_mode(mode, i * 10);
        }
        assert_eq!(f.pending_assemble_ms(), Some(990 + 800));
        assert_eq!(f.mode(), MorphMode::Tree);
    }

    #[test]
    fn return_to_tree_restores_home_exactly() {
        let mut f = field();
        let home = f.home().to_vec();
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.5, 800);
        f.set_mode(MorphMode::Tree, 2_000);
        f.tick(0.5, 2_800);
        assert_eq!(f.targets(), &home[..]);
    }

    #[test]
    fn integration_converges_monotonically() {
        let mut f = field();
        f.set_text_points(text_points(120), 0);
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800); // assemble, no movement yet

        let dist = |f: &ParticleMorphField| -> Vec<f64> {
            f.positions().chunks_exact(3).zip(f.targets().chunks_exact(3))
                .map(|(c, t)| {
                    (0..3).map(|k| ((t[k] - c[k]) as f64).powi(2)).sum::<f64>().sqrt()
                })
                .collect()
        };

        let mut prev = dist(&f);
        let mut now = 800;
        for _ in 0..900 {
            now += 16;
            f.tick(1.0 / 60.0, now);
            let d = dist(&f);
            for (a, b) in d.iter().zip(&prev) {
                assert!(*a <= *b + 1e-6, "distance grew: {} > {}", a, b);
            }
            prev = d;
        }
        assert!(f.max_deviation() < 1e-3);
        assert_eq!(f.phase(), MorphPhase::Steady);
    }

    #[test]
    fn explode_rate_slower_than_assemble() {
        let mut a = field();
        let mut b = field();
        a.set_mode(MorphMode::Text, 0);
        b.set_mode(MorphMode::Text, 0);
        b.tick(0.0, 800);
        // fraction of the gap left after one 0.1 s tick
        let gap = |f: &ParticleMorphField| (f.targets()[0] - f.positions()[0]).abs();
        let (ga, gb) = (gap(&a), gap(&b));
        a.tick(0.1, 10);
        b.tick(0.1, 810);
        assert!((gap(&a) / ga - 0.8).abs() < 1e-3);
        assert!((gap(&b) / gb - 0.7).abs() < 1e-3);
    }

    #[test]
    fn large_dt_snaps_to_target() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        f.tick(10.0, 1);
        assert!(f.max_deviation() < 1e-4);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        let before = f.positions().to_vec();
        f.tick(f32::NAN, 1);
        f.tick(-1.0, 2);
        assert_eq!(f.positions(), &before[..]);
    }

    #[test]
    fn tree_color_updates_live_in_tree_mode() {
        let mut f = field();
        let gold = Rgb::from_hex("#ffcc00").unwrap();
        f.set_tree_color(gold);
        assert_eq!(f.phase(), MorphPhase::Steady);
        assert_eq!(f.pending_assemble_ms(), None);
        let n = N as f32;
        let mean_b = f.target_colors().chunks_exact(3).map(|c| c[2]).sum::<f32>() / n;
        assert!(mean_b.abs() < 0.075);
    }

    #[test]
    fn tree_color_deferred_in_text_mode() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        f.set_tree_color(Rgb::from_hex("#ffcc00").unwrap());
        assert!(f.target_colors().iter().all(|&c| c == 4.0));
        f.set_mode(MorphMode::Tree, 100);
        let n = N as f32;
        let mean_r = f.target_colors().chunks_exact(3).map(|c| c[0]).sum::<f32>() / n;
        assert!((mean_r - 1.0).abs() < 0.075);
    }

    #[test]
    fn new_text_in_text_mode_remorphs() {
        let mut f = field();
        f.set_mode(MorphMode::Text, 0);
        f.tick(0.0, 800);
        assert_eq!(f.phase(), MorphPhase::Assembling);
        f.set_text_points(text_points(10), 5_000);
        assert_eq!(f.phase(), MorphPhase::Exploding);
        assert_eq!(f.pending_assemble_ms(), Some(5_800));
    }

    #[test]
    fn new_text_in_tree_mode_is_only_stored() {
        let mut f = field();
        f.set_text_points(text_points(10), 5_000);
        assert_eq!(f.phase(), MorphPhase::Steady);
        assert_eq!(f.pending_assemble_ms(), None);
    }

    #[test]
    fn mode_helpers() {
        assert_eq!(MorphMode::Tree.toggled(), MorphMode::Text);
        assert_eq!(MorphMode::Text.toggled().name(), "TREE");
        assert_eq!(MorphMode::default(), MorphMode::Tree);
    }
}
