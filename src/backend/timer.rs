use super::BackendSetup;
use crate::{audio::AudioSpec, Backend};
use anyhow::{anyhow, Context, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

#[derive(Debug, Clone, Default)]
pub struct TimerSettings {
    /// Time between callbacks. Defaults to the duration of one buffer.
    pub period: Option<Duration>,
}

/// A device without output: renders every buffer on its own thread at the
/// cadence of the requested spec and discards it.
pub struct TimerBackend {
    settings: TimerSettings,
    setup: Option<BackendSetup>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TimerBackend {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            setup: None,
            running: Arc::default(),
            worker: None,
        }
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Backend for TimerBackend {
    fn setup(&mut self, setup: BackendSetup) -> Result<()> {
        self.setup = Some(setup);
        Ok(())
    }

    fn start(&mut self) -> Result<AudioSpec> {
        self.halt();
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| anyhow!("backend is not set up"))?;
        let spec = setup.desired;
        if spec.freq == 0 || spec.samples == 0 {
            return Err(anyhow!("invalid audio spec {spec:?}"));
        }
        let period = self
            .settings
            .period
            .unwrap_or_else(|| Duration::from_secs_f64(spec.samples as f64 / spec.freq as f64));

        setup.mixer.set_spec(spec);
        let mixer = Arc::clone(&setup.mixer);
        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);
        let worker = thread::Builder::new()
            .name("tether-audio".to_owned())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(period);
                let mut buffer = vec![0u8; spec.buffer_size()];
                while running.load(Ordering::SeqCst) {
                    if ticker.recv().is_err() {
                        break;
                    }
                    mixer.render(&mut buffer);
                }
            })
            .context("failed to spawn audio thread")?;
        self.worker = Some(worker);
        Ok(spec)
    }

    fn consume_broken(&self) -> bool {
        false
    }
}

impl Drop for TimerBackend {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioData, AudioFormat, Mixer};
    use std::time::Instant;

    #[test]
    fn renders_on_its_own_thread() {
        let spec = AudioSpec {
            freq: 8000,
            format: AudioFormat::U8,
            channels: 1,
            samples: 16,
        };
        let mixer = Arc::new(Mixer::new());
        let mut backend = TimerBackend::new(TimerSettings {
            period: Some(Duration::from_millis(1)),
        });
        backend
            .setup(BackendSetup {
                mixer: Arc::clone(&mixer),
                desired: spec,
            })
            .unwrap();
        assert_eq!(backend.start().unwrap(), spec);

        let sound = mixer
            .play(Arc::new(AudioData::from_raw(spec, vec![0x90; 64])), false)
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while sound.is_playing() {
            assert!(Instant::now() < deadline, "sound never finished");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
