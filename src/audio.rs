mod convert;
pub use convert::AudioCvt;

mod mix;
pub use mix::{mix_audio, MAX_VOLUME};

mod mixer;
pub use mixer::Mixer;

mod sound;
pub use sound::Sound;

mod spec;
pub use spec::{AudioFormat, AudioSpec};

pub mod wav;

use crate::backend::{Backend, BackendSetup};
use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, warn};

/// Sample bytes converted to the opened device spec. Immutable once built and
/// shared by every [`Sound`] playing it.
pub struct AudioData {
    path: PathBuf,
    spec: AudioSpec,
    bytes: Vec<u8>,
}

impl AudioData {
    pub fn from_raw(spec: AudioSpec, bytes: Vec<u8>) -> Self {
        Self {
            path: PathBuf::new(),
            spec,
            bytes,
        }
    }

    /// Decodes a WAV file and converts it to `target`.
    pub fn load(path: &Path, target: &AudioSpec) -> Result<Self> {
        let (spec, bytes) = wav::load(path)?;
        let bytes = match AudioCvt::build(&spec, target)? {
            Some(cvt) => cvt.convert(&bytes),
            None => bytes,
        };
        Ok(Self {
            path: path.to_owned(),
            spec: *target,
            bytes,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn spec(&self) -> &AudioSpec {
        &self.spec
    }

    #[inline(always)]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Owns the audio backend and keeps the mixer informed of the opened spec.
pub struct AudioManager {
    backend: Box<dyn Backend>,
    mixer: Arc<Mixer>,
}

impl AudioManager {
    pub fn new(backend: impl Backend + 'static, mixer: Arc<Mixer>, desired: AudioSpec) -> Result<Self> {
        Self::new_box(Box::new(backend), mixer, desired)
    }

    pub fn new_box(mut backend: Box<dyn Backend>, mixer: Arc<Mixer>, desired: AudioSpec) -> Result<Self> {
        backend.setup(BackendSetup {
            mixer: Arc::clone(&mixer),
            desired,
        })?;
        let mut manager = Self { backend, mixer };
        manager.start()?;
        Ok(manager)
    }

    pub fn start(&mut self) -> Result<()> {
        let opened = self.backend.start()?;
        debug!(?opened, "audio opened");
        self.mixer.set_spec(opened);
        Ok(())
    }

    #[inline(always)]
    pub fn consume_broken(&self) -> bool {
        self.backend.consume_broken()
    }

    pub fn recover_if_needed(&mut self) -> Result<()> {
        if self.consume_broken() {
            warn!("audio stream broken, restarting");
            self.start()
        } else {
            Ok(())
        }
    }

    #[inline(always)]
    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_converts_to_target_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let samples: Vec<i16> = (0..50).collect();
        std::fs::write(&path, wav::tests::wav_bytes(22050, 1, &samples)).unwrap();

        let target = AudioSpec {
            freq: 44100,
            format: AudioFormat::S16Lsb,
            channels: 2,
            samples: 1024,
        };
        let data = AudioData::load(&path, &target).unwrap();
        assert_eq!(data.spec(), &target);
        assert_eq!(data.len(), samples.len() * 2 * 4);
        assert_eq!(data.path(), path);
    }
}
