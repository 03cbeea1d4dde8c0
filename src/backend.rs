#[cfg(feature = "cpal")]
pub mod cpal;

pub mod timer;

use crate::audio::{AudioSpec, Mixer};
use anyhow::Result;
use std::sync::Arc;

pub struct BackendSetup {
    pub(crate) mixer: Arc<Mixer>,
    pub(crate) desired: AudioSpec,
}

/// An audio output device. Once started it must call
/// [`Mixer::render`] from its own thread for every buffer it plays.
pub trait Backend {
    fn setup(&mut self, setup: BackendSetup) -> Result<()>;
    /// Opens the device and returns the spec actually obtained.
    fn start(&mut self) -> Result<AudioSpec>;
    fn consume_broken(&self) -> bool;
}
