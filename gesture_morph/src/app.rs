//! The run loop.
//!
//! Per frame: poll window input, drain the hand source's reports into the
//! engine, tick the engine, advance the cosmetic transform, render. The
//! loop is the only thread that touches the engine.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

use anyhow::{anyhow, Result};
use log::{info, warn};
use rand::Rng;

use crate::classifier::GestureClassifier;
use crate::config::AppConfig;
use crate::engine::{Command, MorphEngine};
use crate::gesture::{
    millis_since, spawn_gesture_source, FrameClassifier, FrameReport, SimGestureSource, SimInput,
};
use crate::landmarks::LandmarkFrame;
use crate::visualizer::{CloudTransform, Scene, Visualizer};

/// Feed every queued report to the engine. Keeps the newest hand for the
/// overlay. Returns false once the source has hung up.
pub fn drain_reports<R: Rng>(
    rx:     &Receiver<FrameReport>,
    engine: &mut MorphEngine<R>,
    latest: &mut Option<LandmarkFrame>,
) -> bool {
    loop {
        match rx.try_recv() {
            Ok(report) => {
                *latest = report.landmarks;
                if let Some(ev) = report.event {
                    for c in engine.handle_gesture(&ev) {
                        info!("gesture {} → {:?}", ev.kind.as_str(), c);
                    }
                }
            }
            Err(TryRecvError::Empty)        => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}

/// One-line summary for the bottom of the window.
pub fn status_line<R: Rng>(engine: &MorphEngine<R>) -> String {
    let s = engine.state();
    let gesture = engine.last_gesture().map_or("NONE", |g| g.kind.as_str());
    format!(
        "{}  {:?}  |  POWER {}  |  TREE {}  |  TO {}  |  GESTURE {}",
        s.morph_mode.name(),
        engine.phase(),
        if s.power_on { "ON" } else { "OFF" },
        s.tree_color.to_hex(),
        s.recipient,
        gesture,
    )
}

fn start_source(cfg: &AppConfig, sim_rx: Receiver<SimInput>, epoch: Instant) -> Result<Receiver<FrameReport>> {
    let classify = FrameClassifier::new(GestureClassifier::new(cfg.classifier.clone()), epoch);

    if cfg.use_leap {
        #[cfg(feature = "leap")]
        {
            use crate::gesture::LeapGestureSource;
            info!("hand source: LeapMotion");
            return Ok(spawn_gesture_source(LeapGestureSource::new(classify)));
        }
        #[cfg(not(feature = "leap"))]
        return Err(anyhow!("LeapMotion input needs a build with `--features leap`"));
    }

    info!("hand source: simulator");
    Ok(spawn_gesture_source(SimGestureSource::new(sim_rx, classify)))
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`. It builds the engine,
/// opens the window, starts the hand source (simulated unless LeapMotion is
/// requested) and drives the event/render loop at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<()> {
    let epoch = Instant::now();

    let mut engine = MorphEngine::new(&cfg)?;

    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let reports = start_source(&cfg, sim_rx, epoch)?;

    let mut vis = Visualizer::new(sim_tx).map_err(|e| anyhow!("opening window: {}", e))?;
    info!("window open");

    if cfg.intro_burst {
        engine.intro(millis_since(epoch));
    }

    let mut transform  = CloudTransform::default();
    let mut landmarks  = None;
    let mut source_up  = true;
    let mut commands: Vec<Command> = Vec::new();
    let mut last_frame = Instant::now();

    while vis.is_open() {
        // 1. Window input: UI commands + simulated hand
        if !vis.poll_input(&mut commands) { break; }
        for c in commands.drain(..) {
            engine.apply(c);
        }

        // 2. Hand reports
        if source_up && !drain_reports(&reports, &mut engine, &mut landmarks) {
            warn!("hand source stopped; keyboard controls still work");
            source_up = false;
            landmarks = None;
        }

        // 3. Animation
        let now = Instant::now();
        let dt  = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        engine.tick(dt, millis_since(epoch));
        transform.update(dt, epoch.elapsed().as_secs_f32(), engine.state());

        // 4. Render
        let status = status_line(&engine);
        vis.render(&Scene {
            positions: engine.field().positions(),
            colors:    engine.field().colors(),
            transform,
            landmarks: landmarks.as_ref(),
            gesture:   engine.last_gesture(),
            status:    &status,
        });
    }

    info!("bye");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
