use super::BackendSetup;
use crate::{
    audio::{AudioFormat, AudioSpec, Mixer},
    Backend,
};
use anyhow::{anyhow, Context, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, OutputCallbackInfo, SampleFormat, Stream, StreamConfig, StreamError,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CpalSettings {
    pub buffer_size: Option<u32>,
}

pub struct CpalBackend {
    settings: CpalSettings,
    stream: Option<Stream>,
    broken: Arc<AtomicBool>,
    setup: Option<BackendSetup>,
}

impl CpalBackend {
    pub fn new(settings: CpalSettings) -> Self {
        Self {
            settings,
            stream: None,
            broken: Arc::default(),
            setup: None,
        }
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mixer: Arc<Mixer>,
    error_callback: impl FnMut(StreamError) + Send + 'static,
) -> Result<Stream>
where
    T: cpal::Sample + bytemuck::Pod,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &OutputCallbackInfo| {
            mixer.render(bytemuck::cast_slice_mut(data));
        },
        error_callback,
    )?;
    Ok(stream)
}

impl Backend for CpalBackend {
    fn setup(&mut self, setup: BackendSetup) -> Result<()> {
        self.setup = Some(setup);
        Ok(())
    }

    fn start(&mut self) -> Result<AudioSpec> {
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| anyhow!("backend is not set up"))?;
        self.stream = None;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device is found"))?;
        let supported = device
            .default_output_config()
            .context("cannot get output config")?;
        let sample_format = supported.sample_format();
        let mut config = supported.config();
        config.buffer_size = self
            .settings
            .buffer_size
            .map_or(BufferSize::Default, BufferSize::Fixed);

        let broken = Arc::clone(&self.broken);
        let error_callback = move |err| {
            warn!("audio error: {err:?}");
            if matches!(err, StreamError::DeviceNotAvailable) {
                broken.store(true, Ordering::Relaxed);
            }
        };
        let mixer = Arc::clone(&setup.mixer);
        let (format, stream) = match sample_format {
            SampleFormat::I16 => (
                AudioFormat::S16_SYS,
                build_stream::<i16>(&device, &config, mixer, error_callback),
            ),
            SampleFormat::U16 => (
                AudioFormat::U16_SYS,
                build_stream::<u16>(&device, &config, mixer, error_callback),
            ),
            SampleFormat::F32 => (
                AudioFormat::F32_SYS,
                build_stream::<f32>(&device, &config, mixer, error_callback),
            ),
        };
        let stream = stream.context("failed to build stream")?;
        let spec = AudioSpec {
            freq: config.sample_rate.0,
            format,
            channels: config.channels,
            samples: self
                .settings
                .buffer_size
                .map_or(setup.desired.samples, |it| it.min(u16::MAX as u32) as u16),
        };
        setup.mixer.set_spec(spec);
        stream.play()?;
        self.stream = Some(stream);
        Ok(spec)
    }

    fn consume_broken(&self) -> bool {
        self.broken.fetch_and(false, Ordering::Relaxed)
    }
}
