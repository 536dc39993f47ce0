//! # gesture_morph
//!
//! Hand-gesture controller for a particle display: a cone-shaped "tree" of
//! glowing points that explodes and reassembles into a greeting text.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Condition | Action |
//! |---|---|---|
//! | Pinch, pulled down > 0.03 between frames | at most every 500 ms | toggle power (spin, brightness) |
//! | Pinch → Open | showing the tree | morph into the greeting |
//! | Pinch | showing the greeting | morph back into the tree |
//!
//! Mode changes share one 1500 ms cooldown.
//!
//! ## Pipeline
//!
//! ```text
//! hand source thread ──FrameReport──▶ run loop ─▶ GestureDebouncer ─▶ ApplicationState
//!   (landmarks → GestureClassifier)                                     │
//!                                                        MorphEngine::tick ─▶ ParticleMorphField
//! ```
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: the mouse moves a synthetic hand.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation controls
//!
//! | Input | Effect |
//! |---|---|
//! | mouse | index fingertip position |
//! | `P` / left button (hold) | pinch |
//! | `O` / right button (hold) | open hand |
//! | `C` (hold) | curled index (reads as pinch) |
//! | `L` | one pinch-pull |
//! | `H` | hide / show the hand |
//! | `Space` | toggle power |
//! | `M` | toggle tree / greeting |
//! | `1`–`5` | tree color |
//! | `Q` / `Esc` | quit |

pub mod landmarks;
pub mod classifier;
pub mod debounce;
pub mod engine;
pub mod config;
pub mod gesture;
pub mod visualizer;
pub mod app;
