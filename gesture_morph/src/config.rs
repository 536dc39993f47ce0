//! Application configuration and its command-line front end.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;

use morph_field::FieldConfig;
use particle_shapes::Rgb;

use crate::classifier::ClassifierConfig;
use crate::debounce::DebounceConfig;

/// Placeholder replaced by the recipient's name in the greeting template.
pub const NAME_PLACEHOLDER: &str = "{name}";

pub const DEFAULT_GREETING: &str = "Merry Christmas\nand Happy New Year\nDear {name}";

/// Everything the run loop needs to start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub recipient:   String,
    pub tree_color:  Rgb,
    /// Greeting template; lines split on `\n`.
    pub greeting:    String,
    /// Explode and reassemble the tree once at start-up.
    pub intro_burst: bool,
    /// Fixed RNG seed for a reproducible particle layout.
    pub seed:        Option<u64>,
    /// Font file to use instead of the bundled one.
    pub font_path:   Option<PathBuf>,
    /// Read hands from a LeapMotion controller instead of the simulator.
    pub use_leap:    bool,
    pub classifier:  ClassifierConfig,
    pub debounce:    DebounceConfig,
    pub field:       FieldConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            recipient:   "Friend".to_string(),
            tree_color:  particle_shapes::color::palette_color(0),
            greeting:    DEFAULT_GREETING.to_string(),
            intro_burst: true,
            seed:        None,
            font_path:   None,
            use_leap:    false,
            classifier:  ClassifierConfig::default(),
            debounce:    DebounceConfig::default(),
            field:       FieldConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn particle_count(&self) -> usize { self.field.particle_count }
}

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(
    name = "gesture_morph",
    version,
    about = "Pinch, pull and open your hand to morph a particle tree into a greeting"
)]
pub struct Cli {
    /// Name shown in the greeting.
    #[arg(long, default_value = "Friend")]
    pub recipient: String,

    /// Tree color: a palette name (see --list-colors) or #rrggbb.
    #[arg(long, default_value = "Green", value_name = "NAME|#HEX")]
    pub color: String,

    /// Greeting template; `{name}` is replaced, `\n` starts a new line.
    #[arg(long)]
    pub greeting: Option<String>,

    /// Number of particles.
    #[arg(long, default_value_t = 15_000)]
    pub particles: usize,

    /// RNG seed for a reproducible layout.
    #[arg(long)]
    pub seed: Option<u64>,

    /// TrueType/OpenType font used for the greeting.
    #[arg(long, value_name = "PATH")]
    pub font: Option<PathBuf>,

    /// Skip the start-up explode/assemble of the tree.
    #[arg(long)]
    pub no_intro: bool,

    /// Use a LeapMotion controller for hand input.
    #[cfg(feature = "leap")]
    #[arg(long)]
    pub leap: bool,

    /// Print the tree palette and exit.
    #[arg(long)]
    pub list_colors: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<AppConfig> {
        ensure!(self.particles > 0, "--particles must be at least 1");
        let tree_color = Rgb::parse_named(&self.color)
            .with_context(|| format!("bad --color {:?}", self.color))?;

        let mut cfg = AppConfig {
            recipient: self.recipient,
            tree_color,
            intro_burst: !self.no_intro,
            seed: self.seed,
            font_path: self.font,
            ..AppConfig::default()
        };
        if let Some(g) = self.greeting {
            cfg.greeting = g.replace("\\n", "\n");
        }
        cfg.field.particle_count = self.particles;
        #[cfg(feature = "leap")]
        {
            cfg.use_leap = self.leap;
        }
        Ok(cfg)
    }
}
