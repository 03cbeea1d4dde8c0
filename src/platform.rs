//! The native windowing and rendering layer.
//!
//! A [`Platform`] is not thread safe. It is created on the thread that calls
//! [`run`](crate::run) and never leaves it.

mod headless;
pub use headless::{HeadlessHandle, HeadlessPlatform};

use crate::event::RawEvent;
use std::fmt;
use thiserror::Error;

/// A failure reported by the native layer, carrying its diagnostic.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

pub type NativeResult<T> = Result<T, NativeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeWindow(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeRenderer(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTexture(pub u64);

/// Non-premultiplied RGBA color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// One past the rightmost column, saturated at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(i32::try_from(self.w).unwrap_or(i32::MAX))
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(i32::try_from(self.h).unwrap_or(i32::MAX))
    }
}

/// Texture pixel layouts. `Abgr8888` is R, G, B, A in memory order on little
/// endian machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Abgr8888,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAccess {
    Static,
    Streaming,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    None,
    Blend,
}

pub trait Platform {
    fn create_window(&mut self, title: &str, width: u32, height: u32) -> NativeResult<NativeWindow>;
    fn window_id(&self, window: NativeWindow) -> WindowId;
    fn destroy_window(&mut self, window: NativeWindow);

    fn create_renderer(&mut self, window: NativeWindow) -> NativeResult<NativeRenderer>;
    fn destroy_renderer(&mut self, renderer: NativeRenderer);
    fn set_draw_blend_mode(&mut self, renderer: NativeRenderer, mode: BlendMode) -> NativeResult<()>;

    fn create_texture(
        &mut self,
        renderer: NativeRenderer,
        format: PixelFormat,
        access: TextureAccess,
        width: u32,
        height: u32,
    ) -> NativeResult<NativeTexture>;
    fn update_texture(&mut self, texture: NativeTexture, pixels: &[u8], stride: usize) -> NativeResult<()>;
    fn set_texture_blend_mode(&mut self, texture: NativeTexture, mode: BlendMode) -> NativeResult<()>;
    fn destroy_texture(&mut self, texture: NativeTexture);

    fn set_draw_color(&mut self, renderer: NativeRenderer, color: Color) -> NativeResult<()>;
    fn draw_color(&self, renderer: NativeRenderer) -> NativeResult<Color>;
    fn clear(&mut self, renderer: NativeRenderer) -> NativeResult<()>;
    fn draw_points(&mut self, renderer: NativeRenderer, points: &[Point]) -> NativeResult<()>;
    /// Draws connected segments through `points`.
    fn draw_lines(&mut self, renderer: NativeRenderer, points: &[Point]) -> NativeResult<()>;
    fn draw_rects(&mut self, renderer: NativeRenderer, rects: &[Rect]) -> NativeResult<()>;
    fn fill_rects(&mut self, renderer: NativeRenderer, rects: &[Rect]) -> NativeResult<()>;
    fn copy(&mut self, renderer: NativeRenderer, texture: NativeTexture, dst: Rect) -> NativeResult<()>;
    fn present(&mut self, renderer: NativeRenderer);

    /// Takes the next pending native event, if any.
    fn poll_event(&mut self) -> Option<RawEvent>;
}
