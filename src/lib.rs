//! # auto-selfie
//!
//! Hands-free selfies: watch a webcam, wait for a smile, count down with
//! audio cues, and save the shot.
//!
//! This crate provides:
//! - **Capture state machine**: turns per-frame face and smile detections into
//!   a debounced, timed capture decision ([`CaptureStateMachine`])
//! - **Detector seam**: [`FeatureDetector`] for any backend that returns
//!   bounding boxes for faces, eyes and smiles
//! - **Session loop**: [`Session`] wires a camera, detector and cue player
//!   around the state machine and writes the captured frames
//!
//! ## Countdown
//!
//! 1. The countdown restarts whenever no face is in view and after every capture
//! 2. While a face is smiling, the time left is `capture_interval - elapsed`
//! 3. When the time left drops to `warn_ahead`, the ready cue plays (once)
//! 4. When it reaches zero, the unannotated frame is saved as
//!    `selfie_{n}.png` and the shutter cue plays
//! 5. If the ready cue played but nobody kept smiling for a whole interval,
//!    the countdown restarts
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use auto_selfie::{
//!     CaptureConfig, CaptureStateMachine, Event, FeatureDetector, FeatureKind, Rect,
//! };
//! use image::GrayImage;
//!
//! // A detector that always sees one smiling face
//! struct Smiley;
//!
//! impl FeatureDetector for Smiley {
//!     fn detect(&mut self, kind: FeatureKind, _gray: &GrayImage, region: Rect) -> Vec<Rect> {
//!         match kind {
//!             FeatureKind::Face => vec![Rect::new(100, 80, 160, 160)],
//!             FeatureKind::Eye => Vec::new(),
//!             FeatureKind::Smile => vec![Rect::new(region.x + 40, region.y + 110, 80, 30)],
//!         }
//!     }
//! }
//!
//! let start = Instant::now();
//! let mut machine = CaptureStateMachine::new(CaptureConfig::default(), start);
//! let frame = GrayImage::new(640, 480);
//!
//! let step = machine.process(&mut Smiley, &frame, start + Duration::from_secs(4));
//! assert_eq!(step.events, vec![Event::ReadyCue]);
//!
//! let step = machine.process(&mut Smiley, &frame, start + Duration::from_secs(7));
//! assert_eq!(step.capture(), Some((0, "selfie_0.png")));
//! ```
//!
//! ## Backends
//!
//! - `opencv`: Haar-cascade detector and webcam capture
//! - `rustface`: SeetaFace face detector
//! - `audio`: cue playback with `rodio`
//! - `app`: all of the above plus the `auto-selfie` window binary (`eframe`)

pub mod annotate;
mod config;
mod detector;
mod error;
mod machine;
pub mod session;
mod types;

#[cfg(feature = "audio")]
pub mod audio;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
#[cfg(feature = "rustface")]
pub mod rustface_backend;

pub use config::{
    CaptureConfig, SessionConfig, DEFAULT_CAPTURE_INTERVAL, DEFAULT_WARMUP, DEFAULT_WARN_AHEAD,
};
pub use detector::{crop_region, DetectionParams, FeatureDetector, FeatureKind};
pub use error::{Error, Result};
pub use machine::{selfie_file_name, CaptureStateMachine, Event, Step};
pub use session::{Cue, CuePlayer, FrameSource, Session, SilentPlayer, Status, Tick};
pub use types::{Detections, FaceFeatures, Rect};
