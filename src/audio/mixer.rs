use super::{mix::mix_audio, AudioData, AudioSpec, Sound, MAX_VOLUME};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SoundId(u64);

struct Voice {
    id: SoundId,
    data: Arc<AudioData>,
    cursor: usize,
    repeat: bool,
}

impl Voice {
    #[inline]
    fn exhausted(&self) -> bool {
        !self.repeat && self.cursor >= self.data.len()
    }

    fn mix(&mut self, out: &mut [u8], spec: &AudioSpec) {
        let bytes = self.data.bytes();
        if bytes.is_empty() {
            return;
        }
        let mut dst = 0;
        while dst < out.len() {
            let n = (out.len() - dst).min(bytes.len().saturating_sub(self.cursor));
            mix_audio(
                &mut out[dst..dst + n],
                &bytes[self.cursor..self.cursor + n],
                spec.format,
                MAX_VOLUME,
            );
            dst += n;
            self.cursor += n;
            if !self.repeat {
                break;
            }
            if self.cursor >= bytes.len() {
                self.cursor = 0;
            }
        }
    }
}

#[derive(Default)]
struct MixerState {
    spec: Option<AudioSpec>,
    voices: Vec<Voice>,
}

/// The mixing engine shared between the audio callback and every caller of
/// [`play_wav`](Mixer::play_wav).
///
/// The state lock plays the role of the audio device lock: the callback and
/// all playing-list or cursor mutations run under it. Loading never does.
///
/// The cache map lock is only held to look up a path's slot. Decoding runs
/// under that slot's own lock, so it only holds back loads of the same path.
#[derive(Default)]
pub struct Mixer {
    state: Mutex<MixerState>,
    cache: Mutex<HashMap<PathBuf, Arc<Slot>>>,
    next_id: AtomicU64,
}

type Slot = Mutex<Option<Arc<AudioData>>>;

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the spec the backend actually opened. Cached data and playing
    /// sounds in another layout are discarded.
    pub fn set_spec(&self, spec: AudioSpec) {
        let mut state = self.state.lock();
        if let Some(old) = state.spec.replace(spec) {
            if old.same_layout(&spec) {
                return;
            }
            debug!(?old, new = ?spec, "audio spec changed, dropping converted data");
            state.voices.clear();
            drop(state);
            self.cache.lock().clear();
        }
    }

    pub fn spec(&self) -> Option<AudioSpec> {
        self.state.lock().spec
    }

    fn slot(&self, path: &Path) -> Arc<Slot> {
        let mut cache = self.cache.lock();
        Arc::clone(cache.entry(path.to_owned()).or_default())
    }

    /// Returns the cached data for `path`, decoding and converting it on first
    /// use. Concurrent loads of one path decode it once.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<AudioData>> {
        let path = path.as_ref();
        let entry = self.slot(path);
        let mut slot = entry.lock();
        let spec = self.spec().ok_or(Error::AudioNotOpen)?;
        if let Some(data) = slot.as_ref().filter(|data| data.spec().same_layout(&spec)) {
            return Ok(Arc::clone(data));
        }
        let data = Arc::new(AudioData::load(path, &spec).map_err(|err| Error::load(path, err))?);
        debug!(path = %path.display(), len = data.len(), "loaded audio");
        *slot = Some(Arc::clone(&data));
        Ok(data)
    }

    pub fn play_wav(self: &Arc<Self>, path: impl AsRef<Path>, repeat: bool) -> Result<Sound> {
        let data = self.load(path)?;
        self.play(data, repeat)
    }

    /// Starts a new playback instance of already loaded data.
    pub fn play(self: &Arc<Self>, data: Arc<AudioData>, repeat: bool) -> Result<Sound> {
        let id = SoundId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.state.lock();
            match state.spec {
                None => return Err(Error::AudioNotOpen),
                Some(spec) if !spec.same_layout(data.spec()) => {
                    return Err(Error::load(
                        data.path(),
                        anyhow::anyhow!("data is not in the opened audio format"),
                    ))
                }
                _ => {}
            }
            state.voices.push(Voice {
                id,
                data: Arc::clone(&data),
                cursor: 0,
                repeat,
            });
        }
        Ok(Sound::new(id, data, Arc::clone(self)))
    }

    /// Fills `out` with the mix of every live sound. Called on the audio
    /// thread once per device buffer.
    pub fn render(&self, out: &mut [u8]) {
        let mut state = self.state.lock();
        let Some(spec) = state.spec else {
            out.fill(0);
            return;
        };
        out.fill(spec.silence());
        let before = state.voices.len();
        state.voices.retain_mut(|voice| {
            if voice.exhausted() {
                return false;
            }
            voice.mix(out, &spec);
            !voice.exhausted()
        });
        if state.voices.len() != before {
            trace!(removed = before - state.voices.len(), "sounds finished");
        }
    }

    pub fn playing_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    pub(crate) fn stop(&self, id: SoundId) {
        let mut state = self.state.lock();
        if let Some(voice) = state.voices.iter_mut().find(|voice| voice.id == id) {
            voice.repeat = false;
            voice.cursor = voice.data.len();
        }
    }

    pub(crate) fn position(&self, id: SoundId) -> Option<usize> {
        let state = self.state.lock();
        state
            .voices
            .iter()
            .find(|voice| voice.id == id)
            .map(|voice| voice.cursor)
    }
}
