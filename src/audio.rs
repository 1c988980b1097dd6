//! Cue playback through `rodio`.
//!
//! Clips are read into memory once and decoded again on every play, so a new
//! cue can start while the previous one is still sounding. Overlapping cues
//! are mixed by the output stream.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Source};

use crate::error::{Error, Result};
use crate::session::{Cue, CuePlayer};

/// An encoded sound clip held in memory.
#[derive(Clone)]
pub struct Clip {
    name: String,
    bytes: Arc<[u8]>,
}

impl Clip {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn decoder(&self) -> Result<Decoder<Cursor<Arc<[u8]>>>> {
        Decoder::new(Cursor::new(Arc::clone(&self.bytes)))
            .map_err(|e| Error::Audio(format!("cannot decode {}: {}", self.name, e)))
    }
}

/// Read a clip from disk and check that it decodes.
pub fn load_clip(path: impl AsRef<Path>) -> Result<Clip> {
    let path = path.as_ref();
    let bytes: Arc<[u8]> = std::fs::read(path)?.into();
    let clip = Clip {
        name: path.display().to_string(),
        bytes,
    };
    clip.decoder()?;
    Ok(clip)
}

/// Plays the ready and shutter clips on the default output device.
pub struct RodioCuePlayer {
    // Dropping the stream silences every sound started through the handle.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    ready: Clip,
    shutter: Clip,
}

impl RodioCuePlayer {
    pub fn new(ready: Clip, shutter: Clip) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| Error::Audio(format!("no audio output: {e}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            ready,
            shutter,
        })
    }

    fn try_play(&self, clip: &Clip) -> Result<()> {
        let source = clip.decoder()?.convert_samples::<f32>();
        self.handle
            .play_raw(source)
            .map_err(|e| Error::Audio(format!("cannot play {}: {}", clip.name, e)))
    }
}

impl CuePlayer for RodioCuePlayer {
    fn play(&mut self, cue: Cue) {
        let clip = match cue {
            Cue::Ready => &self.ready,
            Cue::Shutter => &self.shutter,
        };
        if let Err(e) = self.try_play(clip) {
            log::warn!("{e}");
        }
    }
}
