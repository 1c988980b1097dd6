//! One iteration of the capture loop: grab a frame, decide, act.
//!
//! [`Session`] owns the camera, detector, cue player and the
//! [`CaptureStateMachine`]. The window (or a test) calls [`Session::tick`]
//! once per frame; everything the user sees comes back in the [`Tick`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};

use crate::annotate::draw_detections;
use crate::config::{CaptureConfig, SessionConfig};
use crate::detector::FeatureDetector;
use crate::error::{Error, Result};
use crate::machine::{CaptureStateMachine, Event};
use crate::types::Detections;

/// Source of camera frames.
pub trait FrameSource {
    /// Read the next frame. Fails with [`Error::FrameRead`] when the device
    /// stops delivering.
    fn read_frame(&mut self) -> Result<RgbImage>;
}

/// The two sounds the loop can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Ready,
    Shutter,
}

/// Fire-and-forget sound playback. Calls must not block on the clip.
pub trait CuePlayer {
    fn play(&mut self, cue: Cue);
}

/// Player used when no audio output is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl CuePlayer for SilentPlayer {
    fn play(&mut self, cue: Cue) {
        log::trace!("cue {cue:?} (silent)");
    }
}

impl<P: CuePlayer + ?Sized> CuePlayer for Box<P> {
    fn play(&mut self, cue: Cue) {
        (**self).play(cue)
    }
}

/// Snapshot of the countdown for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub warming_up: bool,
    pub images_saved: u64,
    pub ready_announced: bool,
    /// Time left before a smiling face gets captured.
    pub remaining: Duration,
}

/// Output of one [`Session::tick`].
#[derive(Debug, Clone)]
pub struct Tick {
    /// The camera frame with detection boxes drawn on it.
    pub frame: RgbImage,
    pub detections: Detections,
    pub events: Vec<Event>,
    /// Paths written during this tick.
    pub saved: Vec<PathBuf>,
    pub status: Status,
}

pub struct Session<S, D, P> {
    source: S,
    detector: D,
    player: P,
    machine: CaptureStateMachine,
    config: SessionConfig,
    started: Instant,
    armed: bool,
}

impl<S, D, P> Session<S, D, P>
where
    S: FrameSource,
    D: FeatureDetector,
    P: CuePlayer,
{
    /// Create a session whose warm-up starts at `now`.
    pub fn new(
        source: S,
        detector: D,
        player: P,
        capture: CaptureConfig,
        config: SessionConfig,
        now: Instant,
    ) -> Result<Self> {
        capture.validate()?;
        Ok(Self {
            source,
            detector,
            player,
            machine: CaptureStateMachine::new(capture, now),
            config,
            started: now,
            armed: false,
        })
    }

    pub fn machine(&self) -> &CaptureStateMachine {
        &self.machine
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Process one camera frame at time `now`.
    pub fn tick(&mut self, now: Instant) -> Result<Tick> {
        let mut frame = self.source.read_frame()?;

        if !self.armed {
            if now.saturating_duration_since(self.started) < self.config.warmup {
                return Ok(Tick {
                    frame,
                    detections: Detections::default(),
                    events: Vec::new(),
                    saved: Vec::new(),
                    status: self.status(now),
                });
            }
            log::debug!("warm-up over, countdown started");
            self.machine.reset(now);
            self.armed = true;
        }

        let pristine = frame.clone();
        let gray = image::imageops::grayscale(&frame);
        let step = self.machine.process(&mut self.detector, &gray, now);

        let mut saved = Vec::new();
        for event in &step.events {
            match event {
                Event::ReadyCue => {
                    log::debug!("get ready");
                    self.player.play(Cue::Ready);
                }
                Event::Captured { file_name, .. } => {
                    let path = self.config.output_dir.join(file_name);
                    match save_png(&pristine, &path) {
                        Ok(()) => {
                            log::info!(
                                "Smile detected! Photo captured and saved as {}",
                                path.display()
                            );
                            saved.push(path);
                        }
                        Err(e) => log::error!("failed to save {}: {}", path.display(), e),
                    }
                    self.player.play(Cue::Shutter);
                }
                Event::CountdownExpired => {
                    log::info!("No smile detected. Resetting countdown.");
                }
            }
        }

        draw_detections(&mut frame, &step.detections);

        Ok(Tick {
            frame,
            detections: step.detections,
            events: step.events,
            saved,
            status: self.status(now),
        })
    }

    pub fn status(&self, now: Instant) -> Status {
        Status {
            warming_up: !self.armed,
            images_saved: self.machine.image_counter(),
            ready_announced: self.machine.ready_announced(),
            remaining: if self.armed {
                self.machine.remaining(now)
            } else {
                self.machine.config().capture_interval
            },
        }
    }
}

fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(Error::from)
}
