//! Hand sources: LeapMotion hardware and a keyboard/mouse simulator.
//!
//! Both produce full 21-point [`LandmarkFrame`]s and run them through the
//! same [`GestureClassifier`] on their own thread. The render loop receives
//! [`FrameReport`]s over an `mpsc` channel and never needs to know where the
//! hand came from.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use log::info;

use crate::classifier::{GestureClassifier, GestureEvent};
use crate::landmarks::{HandLandmark, Landmark, LandmarkFrame, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// FrameReport
// ════════════════════════════════════════════════════════════════════════════

/// One camera/tracker frame: the hand (if any) and its classification.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub landmarks: Option<LandmarkFrame>,
    pub event:     Option<GestureEvent>,
}

/// Milliseconds elapsed since `epoch`; the shared clock of sources and the
/// render loop.
pub fn millis_since(epoch: Instant) -> u64 {
    epoch.elapsed().as_millis() as u64
}

/// Classifies frames and stamps them on the shared clock.
#[derive(Clone, Debug)]
pub struct FrameClassifier {
    classifier: GestureClassifier,
    epoch:      Instant,
}

impl FrameClassifier {
    pub fn new(classifier: GestureClassifier, epoch: Instant) -> Self {
        FrameClassifier { classifier, epoch }
    }

    pub fn report(&self, landmarks: Option<LandmarkFrame>) -> FrameReport {
        self.report_at(landmarks, millis_since(self.epoch))
    }

    pub fn report_at(&self, landmarks: Option<LandmarkFrame>, timestamp_ms: u64) -> FrameReport {
        let event = self.classifier.classify(landmarks.as_ref(), timestamp_ms);
        FrameReport { landmarks, event }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`FrameReport`]s over a channel.
pub trait GestureSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<FrameReport>);
}

/// Spawn a gesture source on its own thread and return the receiving end.
pub fn spawn_gesture_source<G: GestureSource>(source: G) -> Receiver<FrameReport> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimGestureSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Hand shapes the simulator can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    /// Fingers up, thumb loosely beside the index.
    Relaxed,
    /// Thumb tip on the index tip.
    Pinch,
    /// Thumb spread wide.
    Open,
    /// Index finger folded below its knuckle.
    Curled,
}

/// Raw input from the simulation window, sent once per rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// A hand in `pose` with its index tip at `pointer` (screen-normalized,
    /// already mirrored).
    Hand { pose: SimPose, pointer: (f32, f32) },
    /// A quick downward pinch drag starting at `pointer`.
    PinchPull { pointer: (f32, f32) },
    NoHand,
}

/// Downward travel of one simulated pinch-pull.
pub const SIM_PULL_DISTANCE: f32 = 0.06;

/// Gesture source driven by [`SimInput`] events from the visualizer window.
pub struct SimGestureSource {
    rx:       Receiver<SimInput>,
    classify: FrameClassifier,
}

impl SimGestureSource {
    pub fn new(rx: Receiver<SimInput>, classify: FrameClassifier) -> Self {
        SimGestureSource { rx, classify }
    }
}

impl GestureSource for SimGestureSource {
    fn run(self: Box<Self>, tx: Sender<FrameReport>) {
        info!("gesture: simulated hand ready (mouse + keys)");
        for input in self.rx.iter() {
            let frames = match input {
                SimInput::Hand { pose, pointer } => vec![Some(synth_frame(pose, pointer))],
                SimInput::PinchPull { pointer }  => vec![
                    Some(synth_frame(SimPose::Pinch, pointer)),
                    Some(synth_frame(SimPose::Pinch, (pointer.0, pointer.1 + SIM_PULL_DISTANCE))),
                ],
                SimInput::NoHand => vec![None],
            };
            for frame in frames {
                if tx.send(self.classify.report(frame)).is_err() {
                    return;
                }
            }
        }
    }
}

/// Build a plausible right hand whose index tip sits under `pointer`.
///
/// `pointer` is in mirrored screen space, so the camera-space index tip is
/// at `(1 - x, y)`.
pub fn synth_frame(pose: SimPose, pointer: (f32, f32)) -> LandmarkFrame {
    use HandLandmark::*;

    let tip = Landmark::new(1.0 - pointer.0, pointer.1);
    // index knuckle anchors the rest of the hand
    let knuckle = match pose {
        SimPose::Curled => tip.offset(0.0, -0.03),
        _               => tip.offset(0.0, 0.16),
    };
    let wrist = knuckle.offset(0.06, 0.16);

    let mut pts = [Landmark::default(); LANDMARK_COUNT];
    let mut put = |lm: HandLandmark, p: Landmark| pts[lm.index()] = p;

    put(Wrist, wrist);

    match pose {
        SimPose::Curled => {
            put(IndexMcp, knuckle);
            put(IndexPip, knuckle.offset(-0.01, -0.05));
            put(IndexDip, knuckle.offset(-0.03, -0.01));
            put(IndexTip, tip);
        }
        _ => finger(&mut put, [IndexMcp, IndexPip, IndexDip, IndexTip], knuckle, tip),
    }
    finger(&mut put, [MiddleMcp, MiddlePip, MiddleDip, MiddleTip],
           knuckle.offset(0.035, 0.005), knuckle.offset(0.035, -0.175));
    finger(&mut put, [RingMcp, RingPip, RingDip, RingTip],
           knuckle.offset(0.07, 0.01), knuckle.offset(0.07, -0.15));
    finger(&mut put, [PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
           knuckle.offset(0.10, 0.03), knuckle.offset(0.105, -0.11));

    let thumb_tip = match pose {
        SimPose::Open    => tip.offset(-0.13, 0.12),
        SimPose::Relaxed => tip.offset(-0.07, 0.06),
        SimPose::Pinch   => tip.offset(-0.02, 0.02),
        SimPose::Curled  => tip.offset(-0.10, -0.06),
    };
    finger(&mut put, [ThumbCmc, ThumbMcp, ThumbIp, ThumbTip], wrist.offset(-0.05, -0.03), thumb_tip);

    LandmarkFrame::new(pts)
}

/// Straight finger from `base` to `tip` with joints at 40 % and 70 %.
fn finger(put: &mut impl FnMut(HandLandmark, Landmark), joints: [HandLandmark; 4], base: Landmark, tip: Landmark) {
    let lerp = |t: f32| Landmark::new(base.x + (tip.x - base.x) * t, base.y + (tip.y - base.y) * t);
    put(joints[0], base);
    put(joints[1], lerp(0.4));
    put(joints[2], lerp(0.7));
    put(joints[3], tip);
}

// ════════════════════════════════════════════════════════════════════════════
// LeapGestureSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Gesture source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// The first tracked hand is projected onto the 21-landmark layout: the
/// tracker's x/y plane (millimetres above the device) is mapped into a
/// normalized "image" seen from the user's side, so the classifier's mirror
/// makes the pointer follow the hand directly.
#[cfg(feature = "leap")]
pub struct LeapGestureSource {
    classify: FrameClassifier,
}

#[cfg(feature = "leap")]
impl LeapGestureSource {
    pub fn new(classify: FrameClassifier) -> Self { LeapGestureSource { classify } }
}

/// Half-width of the tracked x range (mm).
#[cfg(feature = "leap")]
const LEAP_HALF_WIDTH: f32 = 200.0;
/// Tracked height range (mm above the device).
#[cfg(feature = "leap")]
const LEAP_Y_MIN:   f32 = 100.0;
#[cfg(feature = "leap")]
const LEAP_Y_RANGE: f32 = 300.0;

#[cfg(feature = "leap")]
fn leap_to_image(x: f32, y: f32) -> Landmark {
    Landmark::new(
        0.5 - x / (2.0 * LEAP_HALF_WIDTH),
        1.0 - (y - LEAP_Y_MIN) / LEAP_Y_RANGE,
    )
}

#[cfg(feature = "leap")]
impl GestureSource for LeapGestureSource {
    fn run(self: Box<Self>, tx: Sender<FrameReport>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                log::error!("gesture: cannot create LeapC connection: {:?}", e);
                return;
            }
        };
        if let Err(e) = connection.open() {
            log::error!("gesture: cannot open LeapMotion device: {:?}", e);
            return;
        }
        info!("gesture: LeapMotion connected");

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let landmarks = frame.hands().next().map(|hand| {
                    let mut pts = [Landmark::default(); LANDMARK_COUNT];
                    let palm = hand.palm().position();
                    pts[HandLandmark::Wrist.index()] = leap_to_image(palm.x, palm.y);
                    // digits come thumb → pinky; joints 1..=4 per finger
                    for (d, digit) in hand.digits().enumerate().take(5) {
                        let joints = [
                            digit.metacarpal().next_joint(),
                            digit.proximal().next_joint(),
                            digit.intermediate().next_joint(),
                            digit.distal().next_joint(),
                        ];
                        for (j, p) in joints.iter().enumerate() {
                            pts[1 + d * 4 + j] = leap_to_image(p.x, p.y);
                        }
                    }
                    LandmarkFrame::new(pts)
                });
                if tx.send(self.classify.report(landmarks)).is_err() {
                    return;
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureKind;

    fn kind_of(pose: SimPose, pointer: (f32, f32)) -> GestureKind {
        GestureClassifier::default()
            .classify(Some(&synth_frame(pose, pointer)), 0)
            .unwrap()
            .kind
    }

    #[test]
    fn synthesized_poses_classify_as_named() {
        for &p in &[(0.5, 0.4), (0.2, 0.3), (0.8, 0.5)] {
            assert_eq!(kind_of(SimPose::Relaxed, p), GestureKind::Idle);
            assert_eq!(kind_of(SimPose::Pinch, p), GestureKind::Pinch);
            assert_eq!(kind_of(SimPose::Open, p), GestureKind::Open);
            assert_eq!(kind_of(SimPose::Curled, p), GestureKind::Pinch);
        }
    }

    #[test]
    fn pointer_follows_mouse() {
        let ev = GestureClassifier::default()
            .classify(Some(&synth_frame(SimPose::Open, (0.3, 0.6))), 0)
            .unwrap();
        assert!((ev.x - 0.3).abs() < 1e-6);
        assert!((ev.y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn sim_source_reports_each_input() {
        let (in_tx, in_rx) = mpsc::channel();
        let src = SimGestureSource::new(
            in_rx,
            FrameClassifier::new(GestureClassifier::default(), Instant::now()),
        );
        let out = spawn_gesture_source(src);

        in_tx.send(SimInput::NoHand).unwrap();
        in_tx.send(SimInput::Hand { pose: SimPose::Open, pointer: (0.5, 0.5) }).unwrap();
        in_tx.send(SimInput::PinchPull { pointer: (0.5, 0.4) }).unwrap();
        drop(in_tx);

        let reports: Vec<FrameReport> = out.iter().collect();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0], FrameReport { landmarks: None, event: None });
        assert_eq!(reports[1].event.map(|e| e.kind), Some(GestureKind::Open));
        let (a, b) = (reports[2].event.unwrap(), reports[3].event.unwrap());
        assert_eq!((a.kind, b.kind), (GestureKind::Pinch, GestureKind::Pinch));
        assert!(b.y - a.y > 0.03);
    }

    #[test]
    fn report_at_uses_given_timestamp() {
        let fc = FrameClassifier::new(GestureClassifier::default(), Instant::now());
        let r = fc.report_at(Some(synth_frame(SimPose::Pinch, (0.5, 0.5))), 1234);
        assert_eq!(r.event.unwrap().timestamp_ms, 1234);
    }
}
