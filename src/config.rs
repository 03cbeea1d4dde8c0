use crate::audio::{AudioFormat, AudioSpec};
use std::time::Duration;

/// Settings for [`run`](crate::run).
#[derive(Debug, Clone)]
pub struct Config {
    /// How often the owner thread polls the native event queue.
    pub poll_rate: Duration,
    /// Capacity of each window's event queue. Events beyond it are dropped.
    pub event_queue_capacity: usize,
    /// Maximum number of events held for windows that are not registered yet.
    pub retry_capacity: usize,
    /// Poll steps a held event survives before it is discarded.
    pub retry_polls: u32,
    /// Spec requested from the audio backend.
    pub audio: AudioSpec,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_rate: Duration::from_millis(10),
            event_queue_capacity: 100,
            retry_capacity: 64,
            retry_polls: 8,
            audio: AudioSpec {
                freq: 44100,
                format: AudioFormat::S16Lsb,
                channels: 2,
                samples: 8096,
            },
        }
    }
}
