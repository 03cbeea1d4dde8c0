use crate::{
    canvas::Canvas,
    dispatch::Owner,
    event::Event,
    platform::{BlendMode, NativeRenderer, NativeTexture, NativeWindow, Platform, WindowId},
    router::Sinks,
    Error, Result, Ui,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::{collections::HashMap, path::PathBuf};
use tracing::debug;

pub(crate) struct Texture {
    pub(crate) tex: NativeTexture,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

/// Owner-side half of a window.
pub struct WindowState {
    pub(crate) native: NativeWindow,
    pub(crate) renderer: NativeRenderer,
    pub(crate) events: Sender<Event>,
    pub(crate) textures: HashMap<PathBuf, Texture>,
}

impl WindowState {
    pub(crate) fn flush(&mut self, platform: &mut dyn Platform) {
        for (_, texture) in self.textures.drain() {
            platform.destroy_texture(texture.tex);
        }
    }

    pub(crate) fn release(mut self, platform: &mut dyn Platform) {
        self.flush(platform);
        platform.destroy_renderer(self.renderer);
        platform.destroy_window(self.native);
    }
}

impl Sinks for HashMap<WindowId, WindowState> {
    fn sink(&self, id: WindowId) -> Option<&Sender<Event>> {
        self.get(&id).map(|state| &state.events)
    }
}

impl Owner {
    fn open_window(&mut self, title: &str, width: u32, height: u32) -> Result<(WindowId, Receiver<Event>)> {
        let platform = self.platform.as_mut();
        let native = platform.create_window(title, width, height)?;
        let renderer = match platform.create_renderer(native) {
            Ok(renderer) => renderer,
            Err(err) => {
                platform.destroy_window(native);
                return Err(err.into());
            }
        };
        if let Err(err) = platform.set_draw_blend_mode(renderer, BlendMode::Blend) {
            platform.destroy_renderer(renderer);
            platform.destroy_window(native);
            return Err(err.into());
        }
        let id = platform.window_id(native);
        let (tx, rx) = bounded(self.event_queue_capacity);
        self.windows.insert(
            id,
            WindowState {
                native,
                renderer,
                events: tx,
                textures: HashMap::new(),
            },
        );
        debug!(window = %id, title, width, height, "window created");
        Ok((id, rx))
    }

    fn window_mut(&mut self, id: WindowId) -> Result<(&mut dyn Platform, &mut WindowState)> {
        let state = self.windows.get_mut(&id).ok_or(Error::WindowDestroyed(id))?;
        Ok((self.platform.as_mut(), state))
    }
}

/// Application-side handle to a native window.
///
/// Every operation except reading events is carried out on the owner thread.
/// Dropping the handle does not close the window; call
/// [`destroy`](Window::destroy).
#[derive(Clone)]
pub struct Window {
    id: WindowId,
    ui: Ui,
    events: Receiver<Event>,
}

impl Window {
    pub fn new(ui: &Ui, title: &str, width: u32, height: u32) -> Result<Self> {
        let title = title.to_owned();
        let (id, events) = ui.call(move |owner| owner.open_window(&title, width, height))??;
        Ok(Self {
            id,
            ui: ui.clone(),
            events,
        })
    }

    #[inline(always)]
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Events routed to this window, in native order.
    #[inline(always)]
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    pub fn destroy(&self) -> Result<()> {
        let id = self.id;
        self.ui.call(move |owner| {
            let state = owner.windows.remove(&id).ok_or(Error::WindowDestroyed(id))?;
            state.release(owner.platform.as_mut());
            debug!(window = %id, "window destroyed");
            Ok(())
        })?
    }

    /// Releases every cached image texture of this window.
    pub fn flush_cache(&self) -> Result<()> {
        let id = self.id;
        self.ui.call(move |owner| {
            let (platform, state) = owner.window_mut(id)?;
            state.flush(platform);
            Ok(())
        })?
    }

    /// Runs `f` with a canvas of this window on the owner thread, then
    /// presents the frame.
    pub fn draw<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Canvas<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let id = self.id;
        self.ui.call(move |owner| {
            let Owner {
                platform,
                windows,
                fonts,
                ..
            } = owner;
            let state = windows.get_mut(&id).ok_or(Error::WindowDestroyed(id))?;
            let renderer = state.renderer;
            let value = f(&mut Canvas::new(platform.as_mut(), state, fonts));
            platform.present(renderer);
            Ok(value)
        })?
    }
}
