use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Time from countdown reset to capture.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(7);

/// How long before the capture the ready cue fires.
pub const DEFAULT_WARN_AHEAD: Duration = Duration::from_secs(3);

/// Frames shown but not evaluated right after the camera opens.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// Timing of the countdown driven by the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub capture_interval: Duration,
    pub warn_ahead: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            warn_ahead: DEFAULT_WARN_AHEAD,
        }
    }
}

impl CaptureConfig {
    /// Build from fractional seconds, as given on the command line.
    pub fn from_secs_f64(capture_interval: f64, warn_ahead: f64) -> Result<Self> {
        let capture_interval = duration_from_secs(capture_interval, "capture interval")?;
        let warn_ahead = duration_from_secs(warn_ahead, "warn-ahead")?;
        let config = Self {
            capture_interval,
            warn_ahead,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "capture interval must be greater than zero".to_string(),
            ));
        }
        if self.warn_ahead >= self.capture_interval {
            return Err(Error::InvalidConfig(format!(
                "warn-ahead ({:.1}s) must be shorter than the capture interval ({:.1}s)",
                self.warn_ahead.as_secs_f64(),
                self.capture_interval.as_secs_f64()
            )));
        }
        Ok(())
    }

    /// Elapsed time since the baseline at which the ready cue becomes due.
    pub fn cue_after(&self) -> Duration {
        self.capture_interval.saturating_sub(self.warn_ahead)
    }
}

/// Settings for the frame loop around the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory captured selfies are written to.
    pub output_dir: PathBuf,
    pub warmup: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl SessionConfig {
    pub fn new(output_dir: impl Into<PathBuf>, warmup_secs: f64) -> Result<Self> {
        Ok(Self {
            output_dir: output_dir.into(),
            warmup: duration_from_secs(warmup_secs, "warm-up")?,
        })
    }
}

fn duration_from_secs(secs: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::InvalidConfig(format!(
            "{what} must be a non-negative number of seconds, got {secs}"
        ))
    })
}
