use crate::{
    font::{Face, FontCache},
    image::{self, PixelBuffer},
    platform::{
        BlendMode, Color, NativeRenderer, NativeResult, NativeTexture, PixelFormat, Platform,
        Point, Rect, TextureAccess,
    },
    window::{Texture, WindowState},
    Error, Result,
};
use std::path::Path;
use tracing::debug;

/// Drawing surface of one window for the duration of a
/// [`Window::draw`](crate::Window::draw) call.
pub struct Canvas<'a> {
    platform: &'a mut dyn Platform,
    window: &'a mut WindowState,
    fonts: &'a mut FontCache,
    face: Option<Face>,
}

fn upload(platform: &mut dyn Platform, renderer: NativeRenderer, image: &PixelBuffer) -> NativeResult<NativeTexture> {
    let tex = platform.create_texture(
        renderer,
        PixelFormat::Abgr8888,
        TextureAccess::Static,
        image.width,
        image.height,
    )?;
    let result = platform
        .update_texture(tex, &image.pixels, image.stride())
        .and_then(|_| platform.set_texture_blend_mode(tex, BlendMode::Blend));
    if let Err(err) = result {
        platform.destroy_texture(tex);
        return Err(err);
    }
    Ok(tex)
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(platform: &'a mut dyn Platform, window: &'a mut WindowState, fonts: &'a mut FontCache) -> Self {
        Self {
            platform,
            window,
            fonts,
            face: None,
        }
    }

    #[inline]
    fn renderer(&self) -> NativeRenderer {
        self.window.renderer
    }

    pub fn clear(&mut self) -> Result<()> {
        Ok(self.platform.clear(self.renderer())?)
    }

    pub fn set_color(&mut self, color: Color) -> Result<()> {
        Ok(self.platform.set_draw_color(self.renderer(), color)?)
    }

    pub fn color(&self) -> Result<Color> {
        Ok(self.platform.draw_color(self.renderer())?)
    }

    pub fn draw_points(&mut self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        Ok(self.platform.draw_points(self.renderer(), points)?)
    }

    /// Draws line segments connecting consecutive points.
    pub fn draw_lines(&mut self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        Ok(self.platform.draw_lines(self.renderer(), points)?)
    }

    pub fn draw_rects(&mut self, rects: &[Rect]) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }
        Ok(self.platform.draw_rects(self.renderer(), rects)?)
    }

    pub fn fill_rects(&mut self, rects: &[Rect]) -> Result<()> {
        if rects.is_empty() {
            return Ok(());
        }
        Ok(self.platform.fill_rects(self.renderer(), rects)?)
    }

    /// Draws a PNG at its natural size with the upper-left corner at `x, y`.
    /// Decoded images stay cached in the window until
    /// [`flush_cache`](crate::Window::flush_cache).
    pub fn draw_png(&mut self, path: impl AsRef<Path>, x: i32, y: i32) -> Result<()> {
        let path = path.as_ref();
        let renderer = self.renderer();
        if !self.window.textures.contains_key(path) {
            let image = image::load_png(path).map_err(|err| Error::load(path, err))?;
            let tex = upload(self.platform, renderer, &image)?;
            debug!(path = %path.display(), width = image.width, height = image.height, "cached image");
            self.window.textures.insert(
                path.to_owned(),
                Texture {
                    tex,
                    width: image.width,
                    height: image.height,
                },
            );
        }
        let Some(texture) = self.window.textures.get(path) else {
            return Ok(());
        };
        let dst = Rect::new(x, y, texture.width, texture.height);
        Ok(self.platform.copy(renderer, texture.tex, dst)?)
    }

    /// Selects the font used by text operations. Sizes are in points.
    pub fn set_font(&mut self, path: impl AsRef<Path>, size: u32) -> Result<()> {
        let path = path.as_ref();
        let font = self.fonts.get(path).map_err(|err| Error::load(path, err))?;
        self.face = Some(Face::new(font, size).map_err(|err| Error::load(path, err))?);
        Ok(())
    }

    /// Draws `s` in the current color with its upper-left corner at `x, y`
    /// and returns the size of the drawn area.
    pub fn fill_string(&mut self, s: &str, x: i32, y: i32) -> Result<(u32, u32)> {
        let color = self.color()?;
        let face = self.face.as_ref().ok_or(Error::NoFont)?;
        let size = face.size(s);
        let Some(image) = face.render(s, color) else {
            return Ok(size);
        };
        let renderer = self.renderer();
        let tex = upload(self.platform, renderer, &image)?;
        let result = self
            .platform
            .copy(renderer, tex, Rect::new(x, y, image.width, image.height));
        self.platform.destroy_texture(tex);
        result?;
        Ok(size)
    }

    pub fn string_size(&self, s: &str) -> Result<(u32, u32)> {
        Ok(self.face.as_ref().ok_or(Error::NoFont)?.size(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        font::tests::system_font,
        image::tests::png_bytes,
        platform::{HeadlessHandle, HeadlessPlatform, WindowId},
    };
    use crossbeam_channel::bounded;
    use std::collections::HashMap;

    struct Fixture {
        platform: HeadlessPlatform,
        handle: HeadlessHandle,
        window: WindowState,
        id: WindowId,
        fonts: FontCache,
    }

    fn fixture() -> Fixture {
        let mut platform = HeadlessPlatform::new();
        let handle = platform.handle();
        let native = platform.create_window("canvas", 16, 16).unwrap();
        let renderer = platform.create_renderer(native).unwrap();
        platform.set_draw_blend_mode(renderer, BlendMode::Blend).unwrap();
        let id = platform.window_id(native);
        let (events, _) = bounded(1);
        Fixture {
            platform,
            handle,
            window: WindowState {
                native,
                renderer,
                events,
                textures: HashMap::new(),
            },
            id,
            fonts: FontCache::new(),
        }
    }

    impl Fixture {
        fn canvas(&mut self) -> Canvas<'_> {
            Canvas::new(&mut self.platform, &mut self.window, &mut self.fonts)
        }
    }

    #[test]
    fn fills_with_the_current_color() {
        let mut fx = fixture();
        {
            let mut canvas = fx.canvas();
            canvas.set_color(Color::rgb(0, 0, 255)).unwrap();
            assert_eq!(canvas.color().unwrap(), Color::rgb(0, 0, 255));
            canvas.fill_rects(&[Rect::new(2, 2, 3, 3)]).unwrap();
            canvas.draw_points(&[]).unwrap();
        }
        assert_eq!(fx.handle.pixel(fx.id, 3, 3), Some(0xFF0000FF));
        assert_eq!(fx.handle.pixel(fx.id, 5, 5), Some(0xFF000000));
    }

    #[test]
    fn png_textures_are_cached_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        std::fs::write(&path, png_bytes(1, 1, png::ColorType::Rgba, &[255, 0, 0, 255])).unwrap();

        let mut fx = fixture();
        {
            let mut canvas = fx.canvas();
            canvas.draw_png(&path, 4, 4).unwrap();
            canvas.draw_png(&path, 5, 4).unwrap();
        }
        assert_eq!(fx.handle.textures_created(), 1);
        assert_eq!(fx.handle.pixel(fx.id, 5, 4), Some(0xFFFF0000));

        fx.window.flush(&mut fx.platform);
        assert_eq!(fx.handle.live_textures(), 0);
        fx.canvas().draw_png(&path, 0, 0).unwrap();
        assert_eq!(fx.handle.textures_created(), 2);
    }

    #[test]
    fn missing_png_is_a_load_error() {
        let mut fx = fixture();
        let err = fx.canvas().draw_png("/nonexistent.png", 0, 0).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(fx.window.textures.is_empty());
    }

    #[test]
    fn text_needs_a_font() {
        let mut fx = fixture();
        let mut canvas = fx.canvas();
        assert!(matches!(canvas.string_size("hi"), Err(Error::NoFont)));
        assert!(matches!(canvas.fill_string("hi", 0, 0), Err(Error::NoFont)));
        assert!(matches!(
            canvas.set_font("/nonexistent.ttf", 12),
            Err(Error::Load { .. })
        ));
    }

    #[test]
    fn text_is_drawn_through_a_temporary_texture() {
        let Some(font) = system_font() else {
            eprintln!("no font available, skipping");
            return;
        };
        let mut fx = fixture();
        let (size, measured) = {
            let mut canvas = fx.canvas();
            canvas.set_font(&font, 12).unwrap();
            canvas.set_color(Color::WHITE).unwrap();
            let measured = canvas.string_size("Hi").unwrap();
            (canvas.fill_string("Hi", 1, 1).unwrap(), measured)
        };
        assert_eq!(size, measured);
        assert!(size.0 > 0 && size.1 > 0);
        assert_eq!(fx.handle.textures_created(), 1);
        assert_eq!(fx.handle.live_textures(), 0);
        assert_eq!(fx.fonts.len(), 1);

        let (w, h) = (size.0.min(15), size.1.min(15));
        let inked = (1..1 + h)
            .flat_map(|y| (1..1 + w).map(move |x| (x, y)))
            .filter(|&(x, y)| fx.handle.pixel(fx.id, x, y) != Some(0xFF000000))
            .count();
        assert!(inked > 0);
        assert_eq!(fx.handle.pixel(fx.id, 0, 0), Some(0xFF000000));
    }

    #[test]
    fn native_failures_surface_as_errors() {
        let mut fx = fixture();
        fx.handle.fail_next("renderer lost");
        let err = fx.canvas().clear().unwrap_err();
        assert!(matches!(err, Error::Native(_)));
        assert_eq!(err.to_string(), "renderer lost");
    }
}
