//! Windows, 2D drawing, input events and sound for programs that want to
//! use them from any thread.
//!
//! Native windowing must stay on one thread. [`run`] turns the calling thread
//! into that owner thread and hands a [`Ui`] to the application, which runs
//! on a thread of its own. Every window operation is shipped to the owner
//! thread and executed there; sound is mixed on the audio backend's thread.
pub mod audio;
pub use audio::{AudioData, AudioFormat, AudioManager, AudioSpec, Mixer, Sound};

pub mod backend;
pub use backend::Backend;

mod canvas;
pub use canvas::Canvas;

mod config;
pub use config::Config;

mod dispatch;
use dispatch::{Dispatcher, Owner};

mod error;
pub use error::{Error, Result};

pub mod event;
pub use event::{Button, Event, Key, WindowEventKind};

pub mod font;

pub mod image;

pub mod platform;
pub use platform::{Color, HeadlessHandle, HeadlessPlatform, Platform, Point, Rect, WindowId};

mod router;

mod window;
pub use window::Window;

use crossbeam_channel::bounded;
use std::{panic, path::Path, sync::Arc, thread};
use tracing::debug;

/// Handle to the running user interface. Cheap to clone and usable from any
/// thread.
#[derive(Clone)]
pub struct Ui {
    dispatcher: Dispatcher,
    mixer: Arc<Mixer>,
    config: Arc<Config>,
}

impl Ui {
    /// Runs `f` on the owner thread and returns its value.
    ///
    /// Calls from different threads never overlap.
    /// Calling this from inside another dispatched closure deadlocks.
    pub fn dispatch<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.dispatcher.call(move |_| f())
    }

    pub(crate) fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Owner) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.dispatcher.call(f)
    }

    pub fn new_window(&self, title: &str, width: u32, height: u32) -> Result<Window> {
        Window::new(self, title, width, height)
    }

    /// Plays a WAV file, loading and converting it on first use.
    pub fn play_wav(&self, path: impl AsRef<Path>, repeat: bool) -> Result<Sound> {
        self.mixer.play_wav(path, repeat)
    }

    #[inline(always)]
    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }

    #[inline(always)]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Opens audio, then runs `entry` on a new thread while the calling thread
/// serves window operations and routes events. Returns once `entry` has
/// returned; a panic in `entry` is resumed here.
pub fn run<F>(
    config: Config,
    platform: impl Platform + 'static,
    backend: impl Backend + 'static,
    entry: F,
) -> Result<()>
where
    F: FnOnce(Ui) + Send + 'static,
{
    let mixer = Arc::new(Mixer::new());
    let mut audio = AudioManager::new(backend, Arc::clone(&mixer), config.audio)?;
    let mut owner = Owner::new(Box::new(platform), &config);
    let (dispatcher, jobs) = Dispatcher::channel();
    let poll_rate = config.poll_rate;
    let ui = Ui {
        dispatcher,
        mixer,
        config: Arc::new(config),
    };

    let (done_tx, done_rx) = bounded::<()>(0);
    let main = thread::Builder::new()
        .name("tether-main".to_owned())
        .spawn(move || {
            let _done = done_tx;
            entry(ui);
        })?;

    dispatch::owner_loop(&mut owner, &mut audio, &jobs, &done_rx, poll_rate);
    drop(jobs);
    owner.shutdown();

    if let Err(payload) = main.join() {
        panic::resume_unwind(payload);
    }
    debug!("user interface finished");
    Ok(())
}
