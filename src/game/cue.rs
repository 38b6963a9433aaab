use crate::core::audio;
use log::debug;
use std::sync::Arc;

/// Fire-and-forget shot cue.
///
/// The sequencer asks for a cue on arrival at the flash frame and once
/// per completed flash; everything past that point is the audio layer's
/// problem. A missing clip or a dead device costs the sound, never the
/// score.
pub struct ShotCue {
    clip: Option<Arc<Vec<i16>>>,
}

impl ShotCue {
    pub fn new(clip: Option<Arc<Vec<i16>>>) -> Self {
        if clip.is_none() {
            debug!("shot cue created without a clip; session will be silent");
        }
        Self { clip }
    }

    pub fn cue(&self) {
        if let Some(clip) = &self.clip {
            audio::play_clip(clip.clone());
        }
    }
}
