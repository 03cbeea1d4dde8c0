use crate::{image::PixelBuffer, platform::Color};
use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};
use tracing::debug;

/// Pixels per inch used to turn point sizes into pixel sizes.
const PX_INCH: f32 = 72.;
const PT_INCH: f32 = 72.;

/// Parsed fonts keyed by path. Lives on the owner thread and is never evicted.
#[derive(Default)]
pub struct FontCache {
    fonts: HashMap<PathBuf, Rc<Font>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &Path) -> Result<Rc<Font>> {
        if let Some(font) = self.fonts.get(path) {
            return Ok(Rc::clone(font));
        }
        let data = std::fs::read(path).context("cannot read file")?;
        let font = Rc::new(
            Font::from_bytes(data, FontSettings::default())
                .map_err(|err| anyhow!("invalid font: {err}"))?,
        );
        debug!(path = %path.display(), "loaded font");
        self.fonts.insert(path.to_owned(), Rc::clone(&font));
        Ok(font)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// A font at a fixed pixel size.
#[derive(Clone)]
pub struct Face {
    font: Rc<Font>,
    px: f32,
    ascent: i32,
    descent: i32,
}

impl Face {
    pub fn new(font: Rc<Font>, size_pt: u32) -> Result<Self> {
        let px = (size_pt as f32 / PT_INCH * PX_INCH).round();
        let metrics = font
            .horizontal_line_metrics(px)
            .ok_or_else(|| anyhow!("font has no horizontal metrics"))?;
        Ok(Self {
            font,
            px,
            ascent: metrics.ascent.round() as i32,
            descent: metrics.descent.round() as i32,
        })
    }

    #[inline]
    pub fn px(&self) -> f32 {
        self.px
    }

    /// `(height, ascent, descent)`; descent is negative below the baseline.
    pub fn extents(&self) -> (u32, i32, i32) {
        ((self.ascent - self.descent).max(0) as u32, self.ascent, self.descent)
    }

    pub fn width(&self, s: &str) -> u32 {
        let mut width = 0.;
        let mut prev = None;
        for c in s.chars() {
            if let Some(prev) = prev {
                width += self.font.horizontal_kern(prev, c, self.px).unwrap_or(0.);
            }
            width += self.font.metrics(c, self.px).advance_width;
            prev = Some(c);
        }
        width.round().max(0.) as u32
    }

    pub fn size(&self, s: &str) -> (u32, u32) {
        (self.width(s), self.extents().0)
    }

    /// Renders `s` in `color` onto a transparent buffer of exactly
    /// [`size`](Self::size). Returns `None` when either side is zero.
    pub fn render(&self, s: &str, color: Color) -> Option<PixelBuffer> {
        let (width, height) = self.size(s);
        if width == 0 || height == 0 {
            return None;
        }
        let mut image = PixelBuffer::new(width, height);
        let stride = image.stride();
        let mut pen = 0.;
        let mut prev = None;
        for c in s.chars() {
            if let Some(prev) = prev {
                pen += self.font.horizontal_kern(prev, c, self.px).unwrap_or(0.);
            }
            let (m, coverage) = self.font.rasterize(c, self.px);
            let left = pen.round() as i32 + m.xmin;
            let top = self.ascent - (m.height as i32 + m.ymin);
            for (i, &cov) in coverage.iter().enumerate() {
                if cov == 0 {
                    continue;
                }
                let x = left + (i % m.width) as i32;
                let y = top + (i / m.width) as i32;
                if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                    continue;
                }
                let idx = y as usize * stride + x as usize * 4;
                let alpha = (cov as u32 * color.a as u32 / 255) as u8;
                let px = &mut image.pixels[idx..idx + 4];
                px[0] = color.r;
                px[1] = color.g;
                px[2] = color.b;
                px[3] = px[3].max(alpha);
            }
            pen += m.advance_width;
            prev = Some(c);
        }
        Some(image)
    }
}
