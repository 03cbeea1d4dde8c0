use super::{
    BlendMode, Color, NativeError, NativeRenderer, NativeResult, NativeTexture, NativeWindow,
    PixelFormat, Platform, Point, Rect, TextureAccess, WindowId,
};
use crate::event::{RawEvent, WindowEventKind};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

struct HeadlessWindow {
    id: WindowId,
    width: u32,
    height: u32,
    renderer: Option<u64>,
}

struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    color: Color,
    blend: BlendMode,
}

impl Surface {
    fn plot(&mut self, x: i32, y: i32, color: Color, blend: BlendMode) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels[idx] = match blend {
            BlendMode::None => color.to_argb(),
            BlendMode::Blend => blend_argb(self.pixels[idx], color),
        };
    }

    /// Clips the segment to the surface so far-away endpoints cost nothing.
    fn clip(&self, from: (i64, i64), to: (i64, i64)) -> Option<((i64, i64), (i64, i64))> {
        let (xmax, ymax) = (self.width as f64 - 1., self.height as f64 - 1.);
        let (x0, y0) = (from.0 as f64, from.1 as f64);
        let (dx, dy) = ((to.0 - from.0) as f64, (to.1 - from.1) as f64);
        let (mut t0, mut t1) = (0f64, 1f64);
        for (p, q) in [(-dx, x0), (dx, xmax - x0), (-dy, y0), (dy, ymax - y0)] {
            if p == 0. {
                if q < 0. {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0. {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
        Some((at(t0), at(t1)))
    }

    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let Some(((mut x0, mut y0), (x1, y1))) =
            self.clip((x0 as i64, y0 as i64), (x1 as i64, y1 as i64))
        else {
            return;
        };
        let (color, blend) = (self.color, self.blend);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x0 as i32, y0 as i32, color, blend);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn fill(&mut self, rect: Rect) {
        let (color, blend) = (self.color, self.blend);
        for y in rect.y.max(0)..rect.bottom().min(self.height as i32) {
            for x in rect.x.max(0)..rect.right().min(self.width as i32) {
                self.plot(x, y, color, blend);
            }
        }
    }
}

fn blend_argb(dst: u32, src: Color) -> u32 {
    let a = src.a as u32;
    let inv = 255 - a;
    let channel = |shift: u32, s: u8| ((s as u32 * a + ((dst >> shift) & 0xFF) * inv) / 255) << shift;
    let out_a = (a + ((dst >> 24) & 0xFF) * inv / 255) << 24;
    out_a | channel(16, src.r) | channel(8, src.g) | channel(0, src.b)
}

struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    blend: BlendMode,
}

#[derive(Default)]
struct Shared {
    next_handle: u64,
    next_window_id: u32,
    windows: HashMap<u64, HeadlessWindow>,
    surfaces: HashMap<u64, Surface>,
    textures: HashMap<u64, Texture>,
    events: VecDeque<RawEvent>,
    textures_created: usize,
    presents: usize,
    failure: Option<String>,
}

impl Shared {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check(&mut self) -> NativeResult<()> {
        match self.failure.take() {
            Some(message) => Err(NativeError(message)),
            None => Ok(()),
        }
    }

    fn surface(&mut self, renderer: NativeRenderer) -> NativeResult<&mut Surface> {
        self.check()?;
        self.surfaces
            .get_mut(&renderer.0)
            .ok_or_else(|| NativeError("invalid renderer".to_owned()))
    }
}

/// A software platform. Windows are in-memory framebuffers and native events
/// come from whatever is pushed through a [`HeadlessHandle`].
#[derive(Default)]
pub struct HeadlessPlatform {
    shared: Arc<Mutex<Shared>>,
}

/// Thread-safe access to a [`HeadlessPlatform`] for injecting events and
/// inspecting its state.
#[derive(Clone)]
pub struct HeadlessHandle {
    shared: Arc<Mutex<Shared>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl HeadlessHandle {
    pub fn push_event(&self, event: RawEvent) {
        self.shared.lock().events.push_back(event);
    }

    /// Makes the next fallible native call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.shared.lock().failure = Some(message.into());
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self.shared.lock().windows.values().map(|w| w.id).collect();
        ids.sort();
        ids
    }

    pub fn live_textures(&self) -> usize {
        self.shared.lock().textures.len()
    }

    pub fn textures_created(&self) -> usize {
        self.shared.lock().textures_created
    }

    pub fn presents(&self) -> usize {
        self.shared.lock().presents
    }

    /// ARGB value of a pixel in the window's framebuffer.
    pub fn pixel(&self, window: WindowId, x: u32, y: u32) -> Option<u32> {
        let shared = self.shared.lock();
        let renderer = shared.windows.values().find(|w| w.id == window)?.renderer?;
        let surface = shared.surfaces.get(&renderer)?;
        if x >= surface.width || y >= surface.height {
            return None;
        }
        surface
            .pixels
            .get(y as usize * surface.width as usize + x as usize)
            .copied()
    }
}

impl Platform for HeadlessPlatform {
    fn create_window(&mut self, _title: &str, width: u32, height: u32) -> NativeResult<NativeWindow> {
        let mut shared = self.shared.lock();
        shared.check()?;
        let handle = shared.handle();
        shared.next_window_id += 1;
        let id = WindowId(shared.next_window_id);
        shared.windows.insert(
            handle,
            HeadlessWindow {
                id,
                width,
                height,
                renderer: None,
            },
        );
        shared
            .events
            .push_back(RawEvent::window(id, WindowEventKind::Shown, 0, 0));
        Ok(NativeWindow(handle))
    }

    fn window_id(&self, window: NativeWindow) -> WindowId {
        self.shared
            .lock()
            .windows
            .get(&window.0)
            .map_or(WindowId(0), |w| w.id)
    }

    fn destroy_window(&mut self, window: NativeWindow) {
        let mut shared = self.shared.lock();
        if let Some(renderer) = shared.windows.remove(&window.0).and_then(|w| w.renderer) {
            shared.surfaces.remove(&renderer);
        }
    }

    fn create_renderer(&mut self, window: NativeWindow) -> NativeResult<NativeRenderer> {
        let mut shared = self.shared.lock();
        shared.check()?;
        let handle = shared.handle();
        let win = shared
            .windows
            .get_mut(&window.0)
            .ok_or_else(|| NativeError("invalid window".to_owned()))?;
        if win.renderer.is_some() {
            return Err(NativeError("renderer already exists for window".to_owned()));
        }
        win.renderer = Some(handle);
        let (width, height) = (win.width, win.height);
        shared.surfaces.insert(
            handle,
            Surface {
                width,
                height,
                pixels: vec![Color::BLACK.to_argb(); width as usize * height as usize],
                color: Color::WHITE,
                blend: BlendMode::None,
            },
        );
        Ok(NativeRenderer(handle))
    }

    fn destroy_renderer(&mut self, renderer: NativeRenderer) {
        let mut shared = self.shared.lock();
        shared.surfaces.remove(&renderer.0);
        for window in shared.windows.values_mut() {
            if window.renderer == Some(renderer.0) {
                window.renderer = None;
            }
        }
    }

    fn set_draw_blend_mode(&mut self, renderer: NativeRenderer, mode: BlendMode) -> NativeResult<()> {
        self.shared.lock().surface(renderer)?.blend = mode;
        Ok(())
    }

    fn create_texture(
        &mut self,
        renderer: NativeRenderer,
        _format: PixelFormat,
        _access: TextureAccess,
        width: u32,
        height: u32,
    ) -> NativeResult<NativeTexture> {
        let mut shared = self.shared.lock();
        shared.surface(renderer)?;
        if width == 0 || height == 0 {
            return Err(NativeError("texture dimensions must be positive".to_owned()));
        }
        let handle = shared.handle();
        shared.textures.insert(
            handle,
            Texture {
                width,
                height,
                pixels: vec![0; width as usize * height as usize * 4],
                blend: BlendMode::None,
            },
        );
        shared.textures_created += 1;
        Ok(NativeTexture(handle))
    }

    fn update_texture(&mut self, texture: NativeTexture, pixels: &[u8], stride: usize) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        shared.check()?;
        let tex = shared
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| NativeError("invalid texture".to_owned()))?;
        let row = tex.width as usize * 4;
        let rows = tex.height as usize;
        if stride < row || pixels.len() < stride * (rows - 1) + row {
            return Err(NativeError("pixel buffer is too small".to_owned()));
        }
        for (y, dst) in tex.pixels.chunks_exact_mut(row).enumerate() {
            dst.copy_from_slice(&pixels[y * stride..y * stride + row]);
        }
        Ok(())
    }

    fn set_texture_blend_mode(&mut self, texture: NativeTexture, mode: BlendMode) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        shared.check()?;
        shared
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| NativeError("invalid texture".to_owned()))?
            .blend = mode;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: NativeTexture) {
        self.shared.lock().textures.remove(&texture.0);
    }

    fn set_draw_color(&mut self, renderer: NativeRenderer, color: Color) -> NativeResult<()> {
        self.shared.lock().surface(renderer)?.color = color;
        Ok(())
    }

    fn draw_color(&self, renderer: NativeRenderer) -> NativeResult<Color> {
        Ok(self.shared.lock().surface(renderer)?.color)
    }

    fn clear(&mut self, renderer: NativeRenderer) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        let surface = shared.surface(renderer)?;
        let color = surface.color.to_argb();
        surface.pixels.fill(color);
        Ok(())
    }

    fn draw_points(&mut self, renderer: NativeRenderer, points: &[Point]) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        let surface = shared.surface(renderer)?;
        let (color, blend) = (surface.color, surface.blend);
        for p in points {
            surface.plot(p.x, p.y, color, blend);
        }
        Ok(())
    }

    fn draw_lines(&mut self, renderer: NativeRenderer, points: &[Point]) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        let surface = shared.surface(renderer)?;
        for pair in points.windows(2) {
            surface.line(pair[0].x, pair[0].y, pair[1].x, pair[1].y);
        }
        Ok(())
    }

    fn draw_rects(&mut self, renderer: NativeRenderer, rects: &[Rect]) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        let surface = shared.surface(renderer)?;
        for r in rects.iter().filter(|r| r.w > 0 && r.h > 0) {
            let (x1, y1) = (r.right() - 1, r.bottom() - 1);
            surface.line(r.x, r.y, x1, r.y);
            surface.line(r.x, y1, x1, y1);
            surface.line(r.x, r.y, r.x, y1);
            surface.line(x1, r.y, x1, y1);
        }
        Ok(())
    }

    fn fill_rects(&mut self, renderer: NativeRenderer, rects: &[Rect]) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        let surface = shared.surface(renderer)?;
        for r in rects {
            surface.fill(*r);
        }
        Ok(())
    }

    fn copy(&mut self, renderer: NativeRenderer, texture: NativeTexture, dst: Rect) -> NativeResult<()> {
        let mut shared = self.shared.lock();
        shared.surface(renderer)?;
        let Shared {
            surfaces, textures, ..
        } = &mut *shared;
        let surface = surfaces
            .get_mut(&renderer.0)
            .ok_or_else(|| NativeError("invalid renderer".to_owned()))?;
        let tex = textures
            .get(&texture.0)
            .ok_or_else(|| NativeError("invalid texture".to_owned()))?;
        if dst.w == 0 || dst.h == 0 {
            return Ok(());
        }
        for y in dst.y.max(0)..dst.bottom().min(surface.height as i32) {
            let sy = ((y as i64 - dst.y as i64) as u64 * tex.height as u64 / dst.h as u64) as usize;
            for x in dst.x.max(0)..dst.right().min(surface.width as i32) {
                let sx = ((x as i64 - dst.x as i64) as u64 * tex.width as u64 / dst.w as u64) as usize;
                let i = (sy * tex.width as usize + sx) * 4;
                let p = &tex.pixels[i..i + 4];
                surface.plot(x, y, Color::rgba(p[0], p[1], p[2], p[3]), tex.blend);
            }
        }
        Ok(())
    }

    fn present(&mut self, _renderer: NativeRenderer) {
        self.shared.lock().presents += 1;
    }

    fn poll_event(&mut self) -> Option<RawEvent> {
        self.shared.lock().events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (HeadlessPlatform, NativeRenderer, WindowId) {
        let mut platform = HeadlessPlatform::new();
        let window = platform.create_window("test", 8, 8).unwrap();
        let renderer = platform.create_renderer(window).unwrap();
        let id = platform.window_id(window);
        (platform, renderer, id)
    }

    #[test]
    fn fill_rect_is_clipped() {
        let (mut platform, renderer, id) = setup();
        let handle = platform.handle();
        platform.set_draw_color(renderer, Color::rgb(255, 0, 0)).unwrap();
        platform.fill_rects(renderer, &[Rect::new(6, 6, 10, 10)]).unwrap();
        assert_eq!(handle.pixel(id, 7, 7), Some(0xFFFF0000));
        assert_eq!(handle.pixel(id, 5, 5), Some(0xFF000000));
    }

    #[test]
    fn blended_texture_copy_mixes_with_background() {
        let (mut platform, renderer, id) = setup();
        let handle = platform.handle();
        platform.set_draw_color(renderer, Color::WHITE).unwrap();
        platform.clear(renderer).unwrap();
        let tex = platform
            .create_texture(renderer, PixelFormat::Abgr8888, TextureAccess::Static, 1, 1)
            .unwrap();
        platform.update_texture(tex, &[0, 0, 0, 0], 4).unwrap();
        platform.set_texture_blend_mode(tex, BlendMode::Blend).unwrap();
        platform.copy(renderer, tex, Rect::new(0, 0, 2, 2)).unwrap();
        assert_eq!(handle.pixel(id, 1, 1), Some(0xFFFFFFFF));
    }

    #[test]
    fn window_creation_announces_itself() {
        let (mut platform, _, id) = setup();
        let event = platform.poll_event().unwrap();
        assert_eq!(event.window, id.0);
        assert!(platform.poll_event().is_none());
    }

    #[test]
    fn injected_failure_is_reported_once() {
        let (mut platform, renderer, _) = setup();
        platform.handle().fail_next("boom");
        let err = platform.clear(renderer).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(platform.clear(renderer).is_ok());
    }

    #[test]
    fn extreme_coordinates_are_clipped() {
        let (mut platform, renderer, id) = setup();
        let handle = platform.handle();
        platform.set_draw_color(renderer, Color::rgb(0, 255, 0)).unwrap();
        let far = [Point::new(i32::MIN, i32::MIN), Point::new(i32::MAX, i32::MAX)];
        platform.draw_lines(renderer, &far).unwrap();
        assert_eq!(handle.pixel(id, 3, 3), Some(0xFF00FF00));
        assert_eq!(handle.pixel(id, 3, 4), Some(0xFF000000));

        let offscreen = [Point::new(i32::MIN, -5), Point::new(i32::MAX, -5)];
        platform.set_draw_color(renderer, Color::rgb(255, 0, 0)).unwrap();
        platform.draw_lines(renderer, &offscreen).unwrap();
        assert_eq!(handle.pixel(id, 0, 0), Some(0xFF00FF00));

        platform.fill_rects(renderer, &[Rect::new(5, 5, u32::MAX, u32::MAX)]).unwrap();
        assert_eq!(handle.pixel(id, 7, 7), Some(0xFFFF0000));
        assert_eq!(handle.pixel(id, 4, 6), Some(0xFF000000));

        let tex = platform
            .create_texture(renderer, PixelFormat::Abgr8888, TextureAccess::Static, 1, 1)
            .unwrap();
        platform.update_texture(tex, &[0, 0, 255, 255], 4).unwrap();
        platform.copy(renderer, tex, Rect::new(-10, 0, u32::MAX, 1)).unwrap();
        assert_eq!(handle.pixel(id, 1, 0), Some(0xFF0000FF));
    }
}
