use anyhow::{bail, Context, Result};
use std::{fs::File, io::BufReader, path::Path};

/// Tightly packed RGBA8 pixels, stride `4 * width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }
}

pub fn load_png(path: &Path) -> Result<PixelBuffer> {
    let file = File::open(path).context("cannot open file")?;
    decode_png(BufReader::new(file))
}

pub fn decode_png(reader: impl std::io::Read) -> Result<PixelBuffer> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().context("invalid png header")?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).context("invalid png data")?;
    if info.width == 0 || info.height == 0 {
        bail!("png has no pixels");
    }
    let bytes = &buf[..info.buffer_size()];
    let pixels = match info.color_type {
        png::ColorType::Rgba => bytes.to_vec(),
        png::ColorType::Rgb => bytes
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::Grayscale => bytes.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Indexed => bail!("indexed png was not expanded"),
    };
    Ok(PixelBuffer {
        width: info.width,
        height: info.height,
        pixels,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32, color: png::ColorType, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn rgb_gains_opaque_alpha() {
        let bytes = png_bytes(2, 1, png::ColorType::Rgb, &[1, 2, 3, 4, 5, 6]);
        let image = decode_png(bytes.as_slice()).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, [1, 2, 3, 255, 4, 5, 6, 255]);
        assert_eq!(image.stride(), 8);
    }

    #[test]
    fn grayscale_alpha_is_widened() {
        let bytes = png_bytes(1, 1, png::ColorType::GrayscaleAlpha, &[9, 128]);
        let image = decode_png(bytes.as_slice()).unwrap();
        assert_eq!(image.pixels, [9, 9, 9, 128]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_png(&b"not a png"[..]).is_err());
    }
}
