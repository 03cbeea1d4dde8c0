use super::{mixer::SoundId, AudioData, Mixer};
use std::sync::Arc;

/// A playing instance of some [`AudioData`].
///
/// Once a sound finishes or is stopped it cannot be restarted; play the data
/// again instead.
#[derive(Clone)]
pub struct Sound {
    id: SoundId,
    data: Arc<AudioData>,
    mixer: Arc<Mixer>,
}

impl Sound {
    pub(crate) fn new(id: SoundId, data: Arc<AudioData>, mixer: Arc<Mixer>) -> Self {
        Self { id, data, mixer }
    }

    /// Stops the sound. It is gone from the mix after the next callback.
    pub fn stop(&self) {
        self.mixer.stop(self.id);
    }

    pub fn is_playing(&self) -> bool {
        self.position().is_some()
    }

    /// Byte offset of the playback cursor, or `None` once the sound was
    /// removed from the mix.
    pub fn position(&self) -> Option<usize> {
        self.mixer.position(self.id)
    }

    #[inline]
    pub fn data(&self) -> &Arc<AudioData> {
        &self.data
    }
}
