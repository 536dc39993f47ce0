//! gesture_morph — interactive entry point.

use clap::Parser;

use gesture_morph::app::run;
use gesture_morph::config::Cli;
use particle_shapes::TREE_PALETTE;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.list_colors {
        for (i, entry) in TREE_PALETTE.iter().enumerate() {
            println!("  {}  {:<7} {}", i + 1, entry.name, entry.hex);
        }
        return;
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Morph — Particle Tree & Greeting Cloud        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let cfg = match cli.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    if cfg.use_leap {
        println!("  Hand input: LeapMotion hardware");
    } else {
        println!("  Hand input: mouse + keyboard simulation");
    }
    println!("  {} particles, greeting for {:?}", cfg.particle_count(), cfg.recipient);
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
