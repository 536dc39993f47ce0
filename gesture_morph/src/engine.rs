//! The application core: scalar state, the command vocabulary, and the
//! single place where particle buffers are driven.
//!
//! Gesture events and UI actions only ever change [`ApplicationState`].
//! [`MorphEngine::tick`] compares that state with what the particle field
//! was last told and forwards the difference (new text, new color, new mode)
//! before advancing the animation, so the field has exactly one writer.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use morph_field::{MorphMode, MorphPhase, ParticleMorphField};
use particle_shapes::glyph::GlyphSampler;
use particle_shapes::Rgb;

use crate::classifier::GestureEvent;
use crate::config::{AppConfig, NAME_PLACEHOLDER};
use crate::debounce::{DebounceConfig, GestureDebouncer};

/// Scalar application state. Particle buffers live in the field.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationState {
    pub power_on:   bool,
    pub morph_mode: MorphMode,
    pub tree_color: Rgb,
    pub recipient:  String,
}

impl ApplicationState {
    pub fn new(tree_color: Rgb, recipient: impl Into<String>) -> Self {
        ApplicationState {
            power_on:   false,
            morph_mode: MorphMode::Tree,
            tree_color,
            recipient:  recipient.into(),
        }
    }
}

/// Everything that can change [`ApplicationState`], whether it comes from
/// the debouncer or from the UI.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    TogglePower,
    SetPower(bool),
    ToggleMode,
    SetMode(MorphMode),
    SetTreeColor(Rgb),
    SetRecipient(String),
}

/// Substitute `name` into a greeting template.
pub fn render_greeting(template: &str, name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, name)
}

// ════════════════════════════════════════════════════════════════════════════
// MorphEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct MorphEngine<R: Rng = StdRng> {
    state:     ApplicationState,
    debouncer: GestureDebouncer,
    field:     ParticleMorphField<R>,
    sampler:   GlyphSampler,
    greeting:  String,
    /// Recipient and color the field currently reflects.
    synced_recipient: String,
    synced_color:     Rgb,
    last_gesture:     Option<GestureEvent>,
}

impl MorphEngine<StdRng> {
    /// Build the engine described by `cfg`, loading the font and sampling
    /// the initial greeting.
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let sampler = match &cfg.font_path {
            Some(path) => GlyphSampler::from_font_file(path)
                .with_context(|| format!("loading font {}", path.display()))?,
            None => GlyphSampler::new().context("loading bundled font")?,
        };
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        let field = ParticleMorphField::with_rng(cfg.field.clone(), cfg.tree_color, rng);
        let state = ApplicationState::new(cfg.tree_color, cfg.recipient.clone());
        Ok(Self::with_parts(state, &cfg.greeting, cfg.debounce.clone(), field, sampler))
    }
}

impl<R: Rng> MorphEngine<R> {
    pub fn with_parts(
        state:    ApplicationState,
        greeting: &str,
        debounce: DebounceConfig,
        mut field: ParticleMorphField<R>,
        sampler:  GlyphSampler,
    ) -> Self {
        let text = Self::sample_greeting(&sampler, greeting, &state.recipient, &field);
        field.set_text_points(text, 0);
        if field.tree_color() != state.tree_color {
            field.set_tree_color(state.tree_color);
        }
        info!(
            "engine: {} particles, recipient {:?}, tree {}",
            field.particle_count(), state.recipient, state.tree_color
        );
        MorphEngine {
            synced_recipient: state.recipient.clone(),
            synced_color:     state.tree_color,
            state,
            debouncer: GestureDebouncer::new(debounce),
            field,
            sampler,
            greeting: greeting.to_string(),
            last_gesture: None,
        }
    }

    fn sample_greeting(
        sampler: &GlyphSampler,
        template: &str,
        name: &str,
        field: &ParticleMorphField<R>,
    ) -> Vec<f32> {
        let text = render_greeting(template, name);
        let cfg = field.config();
        let points = sampler.sample(&text, cfg.text_width, cfg.text_height);
        let k = particle_shapes::point_count(&points);
        if k == 0 {
            warn!("greeting {:?} produced no glyph points", text);
        } else if k > field.particle_count() {
            debug!("greeting: {} glyph points, {} shown", k, field.particle_count());
        }
        points
    }

    /// The start-up burst: explode the tree and let it reassemble.
    pub fn intro(&mut self, now_ms: u64) {
        self.field.set_mode(self.state.morph_mode, now_ms);
    }

    // ── inputs ───────────────────────────────────────────────────────────

    /// Run one classified gesture through the debouncer and apply whatever
    /// it decides. Returns the commands for logging/feedback.
    pub fn handle_gesture(&mut self, event: &GestureEvent) -> Vec<Command> {
        let commands = self.debouncer.handle(event, self.state.morph_mode);
        for c in &commands {
            self.apply(c.clone());
        }
        self.last_gesture = Some(*event);
        commands
    }

    /// Apply one command to the scalar state. The field follows on the
    /// next [`tick`](Self::tick).
    pub fn apply(&mut self, command: Command) {
        debug!("engine: {:?}", command);
        let s = &mut self.state;
        match command {
            Command::TogglePower     => s.power_on = !s.power_on,
            Command::SetPower(on)    => s.power_on = on,
            Command::ToggleMode      => s.morph_mode = s.morph_mode.toggled(),
            Command::SetMode(m)      => s.morph_mode = m,
            Command::SetTreeColor(c) => s.tree_color = c,
            Command::SetRecipient(r) => s.recipient = r,
        }
    }

    // ── frame ────────────────────────────────────────────────────────────

    /// Push pending state changes into the field, then advance it.
    pub fn tick(&mut self, dt_secs: f32, now_ms: u64) {
        self.sync_field(now_ms);
        let before = self.field.phase();
        self.field.tick(dt_secs, now_ms);
        let after = self.field.phase();
        if before != after {
            debug!("engine: phase {:?} → {:?} at {} ms", before, after, now_ms);
        }
    }

    fn sync_field(&mut self, now_ms: u64) {
        // text first, so a simultaneous switch to Text assembles the new greeting
        if self.state.recipient != self.synced_recipient {
            let pts = Self::sample_greeting(&self.sampler, &self.greeting, &self.state.recipient, &self.field);
            self.field.set_text_points(pts, now_ms);
            self.synced_recipient = self.state.recipient.clone();
            // a new name bursts the tree as well
            if self.field.mode() == MorphMode::Tree && self.state.morph_mode == MorphMode::Tree {
                self.field.set_mode(MorphMode::Tree, now_ms);
            }
        }
        if self.state.tree_color != self.synced_color {
            self.field.set_tree_color(self.state.tree_color);
            self.synced_color = self.state.tree_color;
        }
        if self.state.morph_mode != self.field.mode() {
            info!("engine: morph → {}", self.state.morph_mode.name());
            self.field.set_mode(self.state.morph_mode, now_ms);
        }
    }

    // ── read-only views ──────────────────────────────────────────────────

    pub fn state(&self) -> &ApplicationState { &self.state }
    pub fn field(&self) -> &ParticleMorphField<R> { &self.field }
    pub fn phase(&self) -> MorphPhase { self.field.phase() }
    pub fn last_gesture(&self) -> Option<&GestureEvent> { self.last_gesture.as_ref() }
    pub fn debouncer(&self) -> &GestureDebouncer { &self.debouncer }
    pub fn greeting(&self) -> String { render_greeting(&self.greeting, &self.state.recipient) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureKind;
    use morph_field::FieldConfig;
    use particle_shapes::color::palette_color;
    use particle_shapes::glyph::RasterLayout;

    const N: usize = 300;

    fn small_sampler() -> GlyphSampler {
        GlyphSampler::new().unwrap().with_layout(RasterLayout {
            width:        512,
            height:       256,
            font_px:      48.0,
            line_spacing: 52.0,
            stroke_width: 4.0,
            stride:       2,
            threshold:    64,
        })
    }

    fn engine() -> MorphEngine {
        let cfg = FieldConfig { particle_count: N, ..FieldConfig::default() };
        let field = ParticleMorphField::seeded(cfg, palette_color(0), 7);
        MorphEngine::with_parts(
            ApplicationState::new(palette_color(0), "Ada"),
            "Hi\n{name}",
            DebounceConfig::default(),
            field,
            small_sampler(),
        )
    }

    fn ev(kind: GestureKind, y: f32, t: u64) -> GestureEvent {
        GestureEvent { kind, x: 0.5, y, timestamp_ms: t }
    }

    fn run(e: &mut MorphEngine, from_ms: u64, to_ms: u64) {
        let mut t = from_ms;
        while t < to_ms {
            t += 16;
            e.tick(0.016, t);
        }
    }

    #[test]
    fn greeting_substitutes_name() {
        assert_eq!(render_greeting("Dear {name}!", "Ada"), "Dear Ada!");
        assert_eq!(render_greeting("no slot", "Ada"), "no slot");
        assert_eq!(engine().greeting(), "Hi\nAda");
    }

    #[test]
    fn starts_unpowered_in_tree_mode_at_rest() {
        let e = engine();
        assert!(!e.state().power_on);
        assert_eq!(e.state().morph_mode, MorphMode::Tree);
        assert_eq!(e.phase(), MorphPhase::Steady);
        assert_eq!(e.field().positions(), e.field().home());
    }

    #[test]
    fn apply_covers_every_command() {
        let mut e = engine();
        e.apply(Command::TogglePower);
        assert!(e.state().power_on);
        e.apply(Command::SetPower(false));
        assert!(!e.state().power_on);
        e.apply(Command::ToggleMode);
        assert_eq!(e.state().morph_mode, MorphMode::Text);
        e.apply(Command::SetMode(MorphMode::Tree));
        assert_eq!(e.state().morph_mode, MorphMode::Tree);
        e.apply(Command::SetTreeColor(palette_color(2)));
        assert_eq!(e.state().tree_color, palette_color(2));
        e.apply(Command::SetRecipient("Grace".into()));
        assert_eq!(e.state().recipient, "Grace");
    }

    #[test]
    fn commands_touch_only_scalar_state_until_tick() {
        let mut e = engine();
        let before = e.field().positions().to_vec();
        e.apply(Command::SetMode(MorphMode::Text));
        assert_eq!(e.field().mode(), MorphMode::Tree);
        assert_eq!(e.field().positions(), &before[..]);
        e.tick(0.016, 16);
        assert_eq!(e.field().mode(), MorphMode::Text);
        assert_eq!(e.phase(), MorphPhase::Exploding);
    }

    #[test]
    fn pinch_open_gesture_morphs_into_greeting() {
        let mut e = engine();
        assert!(e.handle_gesture(&ev(GestureKind::Pinch, 0.0, 0)).is_empty());
        let out = e.handle_gesture(&ev(GestureKind::Open, 0.0, 40));
        assert_eq!(out, vec![Command::SetMode(MorphMode::Text)]);
        assert_eq!(e.last_gesture().map(|g| g.kind), Some(GestureKind::Open));

        e.tick(0.016, 50);
        run(&mut e, 50, 900);
        assert_eq!(e.phase(), MorphPhase::Assembling);
        let targets = e.field().targets();
        // glyph points are flat, inside the text bounds
        assert_eq!(targets[2], 0.0);
        assert!(targets[0].abs() <= 20.0 && targets[1].abs() <= 10.0);
    }

    #[test]
    fn pinch_pull_toggles_power_without_touching_the_field() {
        let mut e = engine();
        e.handle_gesture(&ev(GestureKind::Idle, 0.40, 0));
        let out = e.handle_gesture(&ev(GestureKind::Pinch, 0.50, 20));
        assert_eq!(out, vec![Command::TogglePower]);
        assert!(e.state().power_on);
        e.tick(0.016, 30);
        assert_eq!(e.phase(), MorphPhase::Steady);
    }

    #[test]
    fn rapid_mode_flips_only_assemble_the_last() {
        let mut e = engine();
        e.apply(Command::SetMode(MorphMode::Text));
        e.tick(0.016, 100);
        e.apply(Command::SetMode(MorphMode::Tree));
        e.tick(0.016, 300);
        assert_eq!(e.field().pending_assemble_ms(), Some(1100));
        run(&mut e, 300, 1200);
        assert_eq!(e.field().targets(), e.field().home());
    }

    #[test]
    fn tree_color_change_is_live_in_tree_mode() {
        let mut e = engine();
        let gold = palette_color(2);
        e.apply(Command::SetTreeColor(gold));
        e.tick(0.016, 16);
        assert_eq!(e.field().tree_color(), gold);
        assert_eq!(e.phase(), MorphPhase::Steady);
        let tc = e.field().target_colors();
        let mean_r = tc.iter().step_by(3).sum::<f32>() / N as f32;
        assert!((mean_r - gold.r).abs() < 0.075);
    }

    #[test]
    fn new_recipient_remorphs_while_showing_text() {
        let mut e = engine();
        e.apply(Command::SetMode(MorphMode::Text));
        e.tick(0.016, 16);
        run(&mut e, 16, 3000);
        let ada = e.field().targets().to_vec();

        e.apply(Command::SetRecipient("Bartholomew".into()));
        e.tick(0.016, 3016);
        assert_eq!(e.phase(), MorphPhase::Exploding);
        run(&mut e, 3016, 6000);
        assert_ne!(e.field().targets(), &ada[..]);
        assert_eq!(e.greeting(), "Hi\nBartholomew");
    }

    #[test]
    fn new_recipient_in_tree_mode_bursts_back_into_tree() {
        let mut e = engine();
        e.apply(Command::SetRecipient("Grace".into()));
        e.tick(0.016, 16);
        assert_eq!(e.phase(), MorphPhase::Exploding);
        assert_eq!(e.field().mode(), MorphMode::Tree);
        run(&mut e, 16, 3000);
        assert_eq!(e.phase(), MorphPhase::Steady);
        assert_eq!(e.field().targets(), e.field().home());
        assert_eq!(e.greeting(), "Hi\nGrace");
    }

    #[test]
    fn unchanged_recipient_leaves_the_tree_at_rest() {
        let mut e = engine();
        e.apply(Command::SetRecipient("Ada".into()));
        e.tick(0.016, 16);
        assert_eq!(e.phase(), MorphPhase::Steady);
    }

    #[test]
    fn intro_bursts_and_returns_to_tree() {
        let mut e = engine();
        e.intro(0);
        assert_eq!(e.phase(), MorphPhase::Exploding);
        run(&mut e, 0, 5000);
        assert_eq!(e.phase(), MorphPhase::Steady);
        assert_eq!(e.field().targets(), e.field().home());
    }

    #[test]
    fn default_greeting_places_every_line() {
        let cfg = AppConfig { seed: Some(1), ..AppConfig::default() };
        let mut e = MorphEngine::new(&cfg).unwrap();
        e.apply(Command::SetMode(MorphMode::Text));
        e.tick(0.016, 16);
        run(&mut e, 16, 900);
        assert_eq!(e.phase(), MorphPhase::Assembling);

        let sentinel = e.field().config().sentinel;
        let placed: Vec<&[f32]> = e
            .field()
            .targets()
            .chunks_exact(3)
            .filter(|p| p[..] != sentinel[..])
            .collect();
        // three lines centered at y ≈ +3.9, 0 and -3.9
        let top    = placed.iter().filter(|p| p[1] > 2.5).count();
        let bottom = placed.iter().filter(|p| p[1] < -3.0).count();
        assert!(top > 0, "first line missing");
        assert!(bottom > 0, "last line missing");
    }

    #[test]
    fn engine_from_config() {
        let mut cfg = AppConfig::default();
        cfg.field.particle_count = 50;
        cfg.seed = Some(3);
        let e = MorphEngine::new(&cfg).unwrap();
        assert_eq!(e.field().particle_count(), 50);
        assert_eq!(e.state().recipient, "Friend");
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let cfg = AppConfig {
            font_path: Some("/definitely/not/here.ttf".into()),
            ..AppConfig::default()
        };
        let err = MorphEngine::new(&cfg).err().unwrap();
        assert!(format!("{:#}", err).contains("loading font"));
    }
}
