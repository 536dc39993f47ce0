//! Turns the per-frame gesture stream into rate-limited commands.
//!
//! | Rule | Condition | Command | Cooldown |
//! |---|---|---|---|
//! | power | pinch moved down by more than `pinch_motion` since the last frame | `TogglePower` | 500 ms |
//! | to text | pinch → open while showing the tree | `SetMode(Text)` | 1500 ms (shared) |
//! | to tree | pinch while showing text | `SetMode(Tree)` | 1500 ms (shared) |
//!
//! The transition is a pure function of `(state, event, mode, now)`, so every
//! rule is testable with hand-picked timestamps. [`GestureDebouncer`] only
//! carries the state between calls.

use log::debug;

use morph_field::MorphMode;

use crate::classifier::{GestureEvent, GestureKind};
use crate::engine::Command;

#[derive(Clone, Debug, PartialEq)]
pub struct DebounceConfig {
    /// Minimum downward travel (normalized y) between consecutive frames
    /// that counts as a pinch-pull.
    pub pinch_motion:      f32,
    pub power_cooldown_ms: u64,
    pub mode_cooldown_ms:  u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        DebounceConfig {
            pinch_motion:      0.03,
            power_cooldown_ms: 500,
            mode_cooldown_ms:  1500,
        }
    }
}

/// Everything the debouncer remembers between frames.
///
/// `None` timers mean the rule has never fired, so the first firing is never
/// held back. `last_pinch_y` starts at the top of the image (0.0).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebounceState {
    pub previous:             GestureKind,
    pub last_pinch_y:         f32,
    pub last_power_toggle_ms: Option<u64>,
    pub last_mode_toggle_ms:  Option<u64>,
}

fn cooled_down(last: Option<u64>, now_ms: u64, cooldown_ms: u64) -> bool {
    match last {
        None    => true,
        Some(t) => now_ms.saturating_sub(t) > cooldown_ms,
    }
}

/// One debouncer transition.
pub fn step(
    state:  &DebounceState,
    event:  &GestureEvent,
    mode:   MorphMode,
    now_ms: u64,
    config: &DebounceConfig,
) -> (DebounceState, Vec<Command>) {
    let mut next = state.clone();
    let mut out  = Vec::new();

    let pulled = event.y - state.last_pinch_y > config.pinch_motion;
    if event.kind == GestureKind::Pinch
        && pulled
        && cooled_down(state.last_power_toggle_ms, now_ms, config.power_cooldown_ms)
    {
        out.push(Command::TogglePower);
        next.last_power_toggle_ms = Some(now_ms);
    }

    if cooled_down(state.last_mode_toggle_ms, now_ms, config.mode_cooldown_ms) {
        let target = match (state.previous, event.kind, mode) {
            (GestureKind::Pinch, GestureKind::Open, MorphMode::Tree) => Some(MorphMode::Text),
            (_, GestureKind::Pinch, MorphMode::Text)                 => Some(MorphMode::Tree),
            _ => None,
        };
        if let Some(m) = target {
            out.push(Command::SetMode(m));
            next.last_mode_toggle_ms = Some(now_ms);
        }
    }

    next.last_pinch_y = event.y;
    next.previous     = event.kind;

    if !out.is_empty() {
        debug!("debounce: {:?} at {} ms → {:?}", event.kind, now_ms, out);
    }
    (next, out)
}

/// Stateful wrapper around [`step`].
#[derive(Clone, Debug, Default)]
pub struct GestureDebouncer {
    config: DebounceConfig,
    state:  DebounceState,
}

impl GestureDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        GestureDebouncer { config, state: DebounceState::default() }
    }

    /// Feed one event, stamped with its own timestamp.
    pub fn handle(&mut self, event: &GestureEvent, mode: MorphMode) -> Vec<Command> {
        let (next, out) = step(&self.state, event, mode, event.timestamp_ms, &self.config);
        self.state = next;
        out
    }

    pub fn state(&self) -> &DebounceState { &self.state }
    pub fn config(&self) -> &DebounceConfig { &self.config }

    /// Forget history (e.g. after the hand source restarts).
    pub fn reset(&mut self) { self.state = DebounceState::default(); }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: GestureKind, y: f32, t: u64) -> GestureEvent {
        GestureEvent { kind, x: 0.5, y, timestamp_ms: t }
    }

    fn power_toggles(d: &mut GestureDebouncer, events: &[GestureEvent]) -> usize {
        events
            .iter()
            .flat_map(|e| d.handle(e, MorphMode::Tree))
            .filter(|c| *c == Command::TogglePower)
            .count()
    }

    #[test]
    fn pinch_pull_toggles_power() {
        let mut d = GestureDebouncer::default();
        assert!(d.handle(&ev(GestureKind::Idle, 0.40, 1000), MorphMode::Tree).is_empty());
        let out = d.handle(&ev(GestureKind::Pinch, 0.45, 1016), MorphMode::Tree);
        assert_eq!(out, vec![Command::TogglePower]);
    }

    #[test]
    fn first_pinch_is_measured_from_the_top() {
        let mut d = GestureDebouncer::default();
        assert_eq!(d.handle(&ev(GestureKind::Pinch, 0.9, 0), MorphMode::Tree), vec![Command::TogglePower]);

        let mut d = GestureDebouncer::default();
        assert!(d.handle(&ev(GestureKind::Pinch, 0.02, 0), MorphMode::Tree).is_empty());
    }

    #[test]
    fn small_or_upward_motion_does_not_toggle() {
        let mut d = GestureDebouncer::default();
        let events = [
            ev(GestureKind::Idle, 0.50, 0),
            ev(GestureKind::Pinch, 0.52, 100),
            ev(GestureKind::Pinch, 0.40, 200),
        ];
        assert_eq!(power_toggles(&mut d, &events), 0);
    }

    #[test]
    fn power_toggles_at_most_once_per_500ms() {
        // y climbs 0.05 per 20 ms frame, resetting every 10 frames
        let mut d = GestureDebouncer::default();
        let events: Vec<_> = (0..=100u64)
            .map(|i| ev(GestureKind::Pinch, 0.05 * (i % 10) as f32, i * 20))
            .collect();
        let mut fired = Vec::new();
        for e in &events {
            if d.handle(e, MorphMode::Tree).contains(&Command::TogglePower) {
                fired.push(e.timestamp_ms);
            }
        }
        assert!(!fired.is_empty());
        for w in fired.windows(2) {
            assert!(w[1] - w[0] > 500, "toggles too close: {:?}", fired);
        }
    }

    #[test]
    fn pinch_then_open_in_tree_mode_shows_text() {
        let mut d = GestureDebouncer::default();
        assert!(d.handle(&ev(GestureKind::Pinch, 0.0, 0), MorphMode::Tree).is_empty());
        let out = d.handle(&ev(GestureKind::Open, 0.0, 30), MorphMode::Tree);
        assert_eq!(out, vec![Command::SetMode(MorphMode::Text)]);
    }

    #[test]
    fn open_without_prior_pinch_does_nothing() {
        let mut d = GestureDebouncer::default();
        d.handle(&ev(GestureKind::Idle, 0.5, 0), MorphMode::Tree);
        assert!(d.handle(&ev(GestureKind::Open, 0.5, 30), MorphMode::Tree).is_empty());
    }

    #[test]
    fn pinch_in_text_mode_shows_tree() {
        let mut d = GestureDebouncer::default();
        let out = d.handle(&ev(GestureKind::Pinch, 0.0, 0), MorphMode::Text);
        assert_eq!(out, vec![Command::SetMode(MorphMode::Tree)]);
    }

    #[test]
    fn mode_changes_at_most_once_per_1500ms_in_either_direction() {
        let mut d = GestureDebouncer::default();
        let mut mode = MorphMode::Tree;
        let mut changes = Vec::new();
        // alternate pinch/open every 50 ms for 5 s, following the commanded mode
        for i in 0..100u64 {
            let kind = if i % 2 == 0 { GestureKind::Pinch } else { GestureKind::Open };
            let t = i * 50;
            for c in d.handle(&ev(kind, 0.5, t), mode) {
                if let Command::SetMode(m) = c {
                    mode = m;
                    changes.push(t);
                }
            }
        }
        assert!(changes.len() >= 2);
        for w in changes.windows(2) {
            assert!(w[1] - w[0] > 1500, "mode changes too close: {:?}", changes);
        }
    }

    #[test]
    fn cooldown_is_shared_between_directions() {
        let cfg = DebounceConfig::default();
        let s = DebounceState::default();
        let (s, out) = step(&s, &ev(GestureKind::Pinch, 0.0, 0), MorphMode::Text, 0, &cfg);
        assert_eq!(out, vec![Command::SetMode(MorphMode::Tree)]);
        // pinch → open in tree mode 1 s later: still cooling down
        let (s, out) = step(&s, &ev(GestureKind::Open, 0.0, 1000), MorphMode::Tree, 1000, &cfg);
        assert!(out.is_empty());
        let (s, _) = step(&s, &ev(GestureKind::Pinch, 0.0, 1400), MorphMode::Tree, 1400, &cfg);
        let (_, out) = step(&s, &ev(GestureKind::Open, 0.0, 1600), MorphMode::Tree, 1600, &cfg);
        assert_eq!(out, vec![Command::SetMode(MorphMode::Text)]);
    }

    #[test]
    fn pull_in_text_mode_emits_power_and_mode() {
        let cfg = DebounceConfig::default();
        let s = DebounceState { last_pinch_y: 0.3, ..Default::default() };
        let (_, out) = step(&s, &ev(GestureKind::Pinch, 0.4, 10), MorphMode::Text, 10, &cfg);
        assert_eq!(out, vec![Command::TogglePower, Command::SetMode(MorphMode::Tree)]);
    }

    #[test]
    fn history_updates_on_every_event() {
        let cfg = DebounceConfig::default();
        let s = DebounceState::default();
        let (s, _) = step(&s, &ev(GestureKind::Idle, 0.2, 0), MorphMode::Tree, 0, &cfg);
        assert_eq!(s.previous, GestureKind::Idle);
        assert_eq!(s.last_pinch_y, 0.2);
        let (s, _) = step(&s, &ev(GestureKind::Open, 0.7, 5), MorphMode::Tree, 5, &cfg);
        assert_eq!(s.previous, GestureKind::Open);
        assert_eq!(s.last_pinch_y, 0.7);
        assert_eq!(s.last_power_toggle_ms, None);
        assert_eq!(s.last_mode_toggle_ms, None);
    }

    #[test]
    fn reset_forgets_history() {
        let mut d = GestureDebouncer::default();
        d.handle(&ev(GestureKind::Pinch, 0.5, 0), MorphMode::Text);
        d.reset();
        assert_eq!(d.state(), &DebounceState::default());
    }
}
