//! Countdown and capture decisions over successive frames.
//!
//! The machine keeps a countdown baseline that is pushed forward whenever no
//! face is visible or a photo was taken. While a face is smiling it checks how
//! much of the capture interval is left: once the remaining time drops to the
//! warn-ahead threshold the ready cue fires (once per countdown), and once it
//! reaches zero a capture is requested.

use std::time::{Duration, Instant};

use image::GrayImage;
use serde::Serialize;

use crate::config::CaptureConfig;
use crate::detector::{FeatureDetector, FeatureKind};
use crate::types::{Detections, FaceFeatures, Rect};

/// Something the caller must act on after a processed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The capture is close; play the ready cue.
    ReadyCue,
    /// Save the unannotated frame as `file_name` and play the shutter cue.
    Captured { index: u64, file_name: String },
    /// The ready cue fired but the smile went away for a whole interval.
    CountdownExpired,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub detections: Detections,
    /// Events in the order they were raised. A frame may carry both
    /// `ReadyCue` and `Captured` when a smile first shows up after the full
    /// interval already elapsed.
    pub events: Vec<Event>,
}

impl Step {
    pub fn capture(&self) -> Option<(u64, &str)> {
        self.events.iter().find_map(|event| match event {
            Event::Captured { index, file_name } => Some((*index, file_name.as_str())),
            _ => None,
        })
    }
}

/// File name used for the `index`-th capture.
pub fn selfie_file_name(index: u64) -> String {
    format!("selfie_{index}.png")
}

/// Debounced, timed capture decisions.
#[derive(Debug, Clone)]
pub struct CaptureStateMachine {
    config: CaptureConfig,
    image_counter: u64,
    last_event: Instant,
    ready_announced: bool,
}

impl CaptureStateMachine {
    /// Start a countdown at `now`.
    pub fn new(config: CaptureConfig, now: Instant) -> Self {
        Self {
            config,
            image_counter: 0,
            last_event: now,
            ready_announced: false,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Number of captures so far, which is also the index of the next one.
    pub fn image_counter(&self) -> u64 {
        self.image_counter
    }

    pub fn ready_announced(&self) -> bool {
        self.ready_announced
    }

    /// Countdown baseline.
    pub fn last_event(&self) -> Instant {
        self.last_event
    }

    /// Restart the countdown from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.last_event = now;
        self.ready_announced = false;
    }

    /// Time left before a smiling face would be captured, zero if overdue.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.config
            .capture_interval
            .saturating_sub(self.elapsed(now))
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_event)
    }

    /// Run detection on `gray` and advance the countdown.
    pub fn process<D>(&mut self, detector: &mut D, gray: &GrayImage, now: Instant) -> Step
    where
        D: FeatureDetector + ?Sized,
    {
        let frame = Rect::full(gray.width(), gray.height());
        let faces = detector.detect(FeatureKind::Face, gray, frame);

        let mut step = Step::default();
        if faces.is_empty() {
            self.reset(now);
            return step;
        }

        let mut faces = faces.into_iter();
        while let Some(face) = faces.next() {
            let mut features = FaceFeatures::new(face);
            features.eyes = detector.detect(FeatureKind::Eye, gray, face);
            features.smiles = detector.detect(FeatureKind::Smile, gray, face);
            let smiling = features.is_smiling();
            step.detections.faces.push(features);

            if !smiling {
                continue;
            }
            if self.on_smile(now, &mut step.events) {
                // One capture per frame; later faces are reported unexamined.
                step.detections.faces.extend(faces.by_ref().map(FaceFeatures::new));
                return step;
            }
        }

        if self.ready_announced && self.elapsed(now) > self.config.capture_interval {
            log::debug!("no smile after the ready cue, restarting countdown");
            self.reset(now);
            step.events.push(Event::CountdownExpired);
        }

        step
    }

    /// Returns true when a capture was requested.
    fn on_smile(&mut self, now: Instant, events: &mut Vec<Event>) -> bool {
        let elapsed = self.elapsed(now);

        if elapsed >= self.config.cue_after() && !self.ready_announced {
            self.ready_announced = true;
            events.push(Event::ReadyCue);
        }

        if elapsed < self.config.capture_interval {
            return false;
        }

        let index = self.image_counter;
        self.image_counter += 1;
        self.reset(now);
        events.push(Event::Captured {
            index,
            file_name: selfie_file_name(index),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Detector whose answers are set directly by the test.
    #[derive(Default)]
    struct Scripted {
        faces: Vec<Rect>,
        smiling: Vec<bool>,
        calls: Vec<(FeatureKind, Rect)>,
    }

    impl Scripted {
        fn nobody() -> Self {
            Self::default()
        }

        fn one_face(smiling: bool) -> Self {
            Self {
                faces: vec![Rect::new(100, 100, 200, 200)],
                smiling: vec![smiling],
                calls: Vec::new(),
            }
        }
    }

    impl FeatureDetector for Scripted {
        fn detect(&mut self, kind: FeatureKind, _gray: &GrayImage, region: Rect) -> Vec<Rect> {
            self.calls.push((kind, region));
            match kind {
                FeatureKind::Face => self.faces.clone(),
                FeatureKind::Eye => vec![Rect::new(region.x + 10, region.y + 10, 20, 20)],
                FeatureKind::Smile => {
                    let idx = self.faces.iter().position(|f| *f == region);
                    match idx {
                        Some(i) if self.smiling[i] => {
                            vec![Rect::new(region.x + 50, region.y + 150, 60, 30)]
                        }
                        _ => Vec::new(),
                    }
                }
            }
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Frame timestamps at 10 fps, kept integral to avoid float drift.
    fn tick(i: u64) -> Duration {
        Duration::from_millis(i * 100)
    }

    fn gray() -> GrayImage {
        GrayImage::new(640, 480)
    }

    #[test]
    fn no_faces_keeps_resetting() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let mut detector = Scripted::nobody();

        for i in 0..200 {
            let now = t0 + tick(i);
            let step = machine.process(&mut detector, &gray(), now);
            assert!(step.events.is_empty());
            assert!(step.detections.is_empty());
            assert!(!machine.ready_announced());
            assert_eq!(machine.image_counter(), 0);
            assert_eq!(machine.last_event(), now);
        }
    }

    #[test]
    fn sustained_smile_cues_then_captures() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let mut detector = Scripted::one_face(true);

        for t in [0.0, 1.0, 2.0, 3.0, 3.9] {
            let step = machine.process(&mut detector, &gray(), t0 + secs(t));
            assert!(step.events.is_empty(), "unexpected event at t={t}");
        }

        let step = machine.process(&mut detector, &gray(), t0 + secs(4.0));
        assert_eq!(step.events, vec![Event::ReadyCue]);
        assert!(machine.ready_announced());

        for t in [4.5, 5.0, 6.0, 6.9] {
            let step = machine.process(&mut detector, &gray(), t0 + secs(t));
            assert!(step.events.is_empty(), "unexpected event at t={t}");
        }

        let capture_time = t0 + secs(7.0);
        let step = machine.process(&mut detector, &gray(), capture_time);
        assert_eq!(
            step.events,
            vec![Event::Captured {
                index: 0,
                file_name: "selfie_0.png".to_string()
            }]
        );
        assert_eq!(machine.image_counter(), 1);
        assert_eq!(machine.last_event(), capture_time);
        assert!(!machine.ready_announced());
    }

    #[test]
    fn second_cycle_counts_from_capture() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let mut detector = Scripted::one_face(true);

        let mut captured = Vec::new();
        let mut cues = 0;
        // 10 fps for 15 s
        for i in 0..=150 {
            let now = t0 + tick(i);
            let step = machine.process(&mut detector, &gray(), now);
            for event in step.events {
                match event {
                    Event::ReadyCue => cues += 1,
                    Event::Captured { file_name, .. } => captured.push((i, file_name)),
                    Event::CountdownExpired => panic!("smile never stopped"),
                }
            }
        }

        assert_eq!(
            captured,
            vec![(70, "selfie_0.png".to_string()), (140, "selfie_1.png".to_string())]
        );
        assert_eq!(cues, 2);
    }

    #[test]
    fn face_without_smile_never_captures() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let mut detector = Scripted::one_face(false);

        for i in 0..=100 {
            let step = machine.process(&mut detector, &gray(), t0 + tick(i));
            assert!(step.events.is_empty());
            assert_eq!(step.detections.num_faces(), 1);
            assert!(!step.detections.faces[0].eyes.is_empty());
        }
        assert_eq!(machine.image_counter(), 0);
        assert!(!machine.ready_announced());
        // Baseline untouched while a face stays in view
        assert_eq!(machine.last_event(), t0);
    }

    #[test]
    fn first_smile_after_full_interval_cues_and_captures_together() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);

        let mut detector = Scripted::one_face(false);
        machine.process(&mut detector, &gray(), t0 + secs(9.0));

        let mut detector = Scripted::one_face(true);
        let step = machine.process(&mut detector, &gray(), t0 + secs(10.0));
        assert_eq!(step.events.len(), 2);
        assert_eq!(step.events[0], Event::ReadyCue);
        assert_eq!(step.capture(), Some((0, "selfie_0.png")));
        assert!(!machine.ready_announced());
    }

    #[test]
    fn losing_the_face_restarts_countdown() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let mut smiling = Scripted::one_face(true);
        let mut nobody = Scripted::nobody();

        machine.process(&mut smiling, &gray(), t0 + secs(1.0));
        machine.process(&mut smiling, &gray(), t0 + secs(2.0));
        // Face absent from 2.0 through 2.5
        for t in [2.0, 2.1, 2.3, 2.5] {
            machine.process(&mut nobody, &gray(), t0 + secs(t));
        }
        assert_eq!(machine.last_event(), t0 + secs(2.5));

        let mut events = Vec::new();
        for i in 26..=100 {
            let now = t0 + tick(i);
            let step = machine.process(&mut smiling, &gray(), now);
            for event in step.events {
                events.push((i, event));
            }
        }

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], (65, Event::ReadyCue));
        assert_eq!(events[1].0, 95);
        assert!(matches!(events[1].1, Event::Captured { index: 0, .. }));
    }

    #[test]
    fn losing_the_face_after_cue_clears_flag() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);

        let step = machine.process(&mut Scripted::one_face(true), &gray(), t0 + secs(5.0));
        assert_eq!(step.events, vec![Event::ReadyCue]);

        machine.process(&mut Scripted::nobody(), &gray(), t0 + secs(5.5));
        assert!(!machine.ready_announced());
        assert_eq!(machine.remaining(t0 + secs(5.5)), secs(7.0));
    }

    #[test]
    fn smile_stopping_after_cue_expires_countdown() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);

        let step = machine.process(&mut Scripted::one_face(true), &gray(), t0 + secs(4.0));
        assert_eq!(step.events, vec![Event::ReadyCue]);

        let mut frowning = Scripted::one_face(false);
        for t in [5.0, 6.0, 7.0] {
            let step = machine.process(&mut frowning, &gray(), t0 + secs(t));
            assert!(step.events.is_empty(), "t={t}");
        }

        // Strictly more than the interval since the baseline
        let step = machine.process(&mut frowning, &gray(), t0 + secs(7.1));
        assert_eq!(step.events, vec![Event::CountdownExpired]);
        assert!(!machine.ready_announced());
        assert_eq!(machine.last_event(), t0 + secs(7.1));
        assert_eq!(machine.image_counter(), 0);
    }

    #[test]
    fn first_smiling_face_wins() {
        let t0 = Instant::now();
        let mut machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        let faces = vec![
            Rect::new(0, 0, 100, 100),
            Rect::new(200, 0, 100, 100),
            Rect::new(400, 0, 100, 100),
        ];
        let mut detector = Scripted {
            faces: faces.clone(),
            smiling: vec![false, true, true],
            calls: Vec::new(),
        };

        let step = machine.process(&mut detector, &gray(), t0 + secs(8.0));
        assert_eq!(step.capture(), Some((0, "selfie_0.png")));
        assert_eq!(machine.image_counter(), 1);

        // Third face reported but never searched for eyes or smiles
        assert_eq!(step.detections.num_faces(), 3);
        assert!(step.detections.faces[2].eyes.is_empty());
        assert!(!detector.calls.iter().any(|(_, region)| *region == faces[2]));
        assert_eq!(detector.calls.len(), 1 + 2 * 2);
    }

    #[test]
    fn remaining_counts_down_and_saturates() {
        let t0 = Instant::now();
        let machine = CaptureStateMachine::new(CaptureConfig::default(), t0);
        assert_eq!(machine.remaining(t0), secs(7.0));
        assert_eq!(machine.remaining(t0 + secs(2.5)), secs(4.5));
        assert_eq!(machine.remaining(t0 + secs(30.0)), Duration::ZERO);
    }

    #[test]
    fn event_json_shape() {
        let captured = Event::Captured {
            index: 3,
            file_name: selfie_file_name(3),
        };
        assert_eq!(
            serde_json::to_string(&captured).unwrap(),
            r#"{"event":"captured","index":3,"file_name":"selfie_3.png"}"#
        );
        assert_eq!(
            serde_json::to_string(&Event::ReadyCue).unwrap(),
            r#"{"event":"ready_cue"}"#
        );
    }
}
