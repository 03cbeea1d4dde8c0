use super::{AudioFormat, AudioSpec};
use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelMap {
    Keep,
    MonoToStereo,
    StereoToMono,
}

/// A prepared conversion between two audio specs.
///
/// `len_mult` bounds how much a buffer can grow: a converted buffer never
/// exceeds `len * len_mult` bytes. `len_ratio` is the exact expected ratio.
#[derive(Debug, Clone, Copy)]
pub struct AudioCvt {
    src: AudioSpec,
    dst: AudioSpec,
    channels: ChannelMap,
    pub len_mult: usize,
    pub len_ratio: f64,
}

impl AudioCvt {
    /// Returns `Ok(None)` when the layouts already match and no conversion is
    /// needed.
    pub fn build(src: &AudioSpec, dst: &AudioSpec) -> Result<Option<Self>> {
        if src.channels == 0 || dst.channels == 0 {
            bail!("invalid channel count");
        }
        if src.freq == 0 || dst.freq == 0 {
            bail!("invalid sample rate");
        }
        let channels = match (src.channels, dst.channels) {
            (a, b) if a == b => ChannelMap::Keep,
            (1, 2) => ChannelMap::MonoToStereo,
            (2, 1) => ChannelMap::StereoToMono,
            (a, b) => bail!("cannot convert {a} channels to {b}"),
        };
        if src.same_layout(dst) {
            return Ok(None);
        }
        let len_ratio = (dst.frame_size() as f64 / src.frame_size() as f64)
            * (dst.freq as f64 / src.freq as f64);
        Ok(Some(Self {
            src: *src,
            dst: *dst,
            channels,
            len_mult: (len_ratio.ceil() as usize).max(1),
            len_ratio,
        }))
    }

    pub fn convert(&self, data: &[u8]) -> Vec<u8> {
        let src_bps = self.src.format.bytes_per_sample();
        let src_channels = self.src.channels as usize;
        let dst_channels = self.dst.channels as usize;

        let mut frames = Vec::with_capacity(data.len() / src_bps / src_channels * dst_channels);
        for frame in data.chunks_exact(self.src.frame_size()) {
            let sample = |c: usize| read_sample(self.src.format, &frame[c * src_bps..]);
            match self.channels {
                ChannelMap::Keep => frames.extend((0..src_channels).map(sample)),
                ChannelMap::MonoToStereo => {
                    let s = sample(0);
                    frames.extend([s, s]);
                }
                ChannelMap::StereoToMono => frames.push((sample(0) + sample(1)) * 0.5),
            }
        }
        if self.src.freq != self.dst.freq {
            frames = resample(&frames, dst_channels, self.src.freq, self.dst.freq);
        }

        let mut out = Vec::with_capacity(data.len() * self.len_mult);
        for sample in frames {
            write_sample(self.dst.format, sample, &mut out);
        }
        out
    }
}

fn resample(input: &[f32], channels: usize, from: u32, to: u32) -> Vec<f32> {
    let in_frames = input.len() / channels;
    let out_frames = (in_frames as u64 * to as u64 / from as u64) as usize;
    let step = from as f64 / to as f64;
    let mut out = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        let position = i as f64 * step;
        let index = position as usize;
        let next = (index + 1).min(in_frames - 1);
        let f = (position - index as f64) as f32;
        for c in 0..channels {
            let a = input[index * channels + c];
            let b = input[next * channels + c];
            out.push(a + (b - a) * f);
        }
    }
    out
}

macro_rules! read_as {
    ($ty:ty, $format:expr, $bytes:expr) => {{
        let raw: [u8; std::mem::size_of::<$ty>()] = $bytes[..std::mem::size_of::<$ty>()]
            .try_into()
            .unwrap_or_default();
        if $format.is_big_endian() {
            <$ty>::from_be_bytes(raw)
        } else {
            <$ty>::from_le_bytes(raw)
        }
    }};
}

macro_rules! write_as {
    ($value:expr, $format:expr, $out:expr) => {{
        let value = $value;
        if $format.is_big_endian() {
            $out.extend_from_slice(&value.to_be_bytes());
        } else {
            $out.extend_from_slice(&value.to_le_bytes());
        }
    }};
}

/// Reads one sample as a float in `[-1, 1]`.
pub(crate) fn read_sample(format: AudioFormat, bytes: &[u8]) -> f32 {
    use AudioFormat::*;
    match format {
        U8 => (bytes[0] as f32 - 128.) / 128.,
        S8 => bytes[0] as i8 as f32 / 128.,
        U16Lsb | U16Msb => (read_as!(u16, format, bytes) as f32 - 32768.) / 32768.,
        S16Lsb | S16Msb => read_as!(i16, format, bytes) as f32 / 32768.,
        S32Lsb | S32Msb => read_as!(i32, format, bytes) as f32 / 2147483648.,
        F32Lsb | F32Msb => read_as!(f32, format, bytes),
    }
}

pub(crate) fn write_sample(format: AudioFormat, sample: f32, out: &mut Vec<u8>) {
    use AudioFormat::*;
    let s = sample.clamp(-1., 1.);
    match format {
        U8 => out.push((s * 128. + 128.).round().clamp(0., 255.) as u8),
        S8 => out.push((s * 128.).round().clamp(-128., 127.) as i8 as u8),
        U16Lsb | U16Msb => {
            write_as!((s * 32768. + 32768.).round().clamp(0., 65535.) as u16, format, out)
        }
        S16Lsb | S16Msb => {
            write_as!((s * 32768.).round().clamp(-32768., 32767.) as i16, format, out)
        }
        S32Lsb | S32Msb => write_as!((s as f64 * 2147483648.).round() as i32, format, out),
        F32Lsb | F32Msb => write_as!(s, format, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(freq: u32, format: AudioFormat, channels: u16) -> AudioSpec {
        AudioSpec {
            freq,
            format,
            channels,
            samples: 1024,
        }
    }

    #[test]
    fn matching_specs_need_no_conversion() {
        let a = spec(44100, AudioFormat::S16Lsb, 2);
        let b = AudioSpec { samples: 4096, ..a };
        assert!(AudioCvt::build(&a, &b).unwrap().is_none());
    }

    #[test]
    fn unsupported_channel_layout_is_an_error() {
        let err = AudioCvt::build(
            &spec(44100, AudioFormat::S16Lsb, 6),
            &spec(44100, AudioFormat::S16Lsb, 2),
        )
        .unwrap_err();
        assert!(err.to_string().contains("6 channels"));
    }

    #[test]
    fn output_length_follows_len_mult() {
        let src = spec(22050, AudioFormat::S16Lsb, 1);
        let dst = spec(44100, AudioFormat::S16Lsb, 2);
        let cvt = AudioCvt::build(&src, &dst).unwrap().unwrap();
        assert_eq!(cvt.len_mult, 4);

        let input: Vec<u8> = (0..100i16).flat_map(|s| (s * 100).to_le_bytes()).collect();
        let output = cvt.convert(&input);
        assert_eq!(output.len(), input.len() * cvt.len_mult);
        assert_ne!(output.len(), input.len());
    }

    #[test]
    fn output_never_exceeds_len_mult() {
        let src = spec(8000, AudioFormat::U8, 1);
        let dst = spec(44100, AudioFormat::F32Lsb, 2);
        let cvt = AudioCvt::build(&src, &dst).unwrap().unwrap();
        let input = vec![0x80u8; 333];
        let output = cvt.convert(&input);
        assert!(output.len() <= input.len() * cvt.len_mult);
        assert_eq!(output.len() % dst.frame_size(), 0);
        assert!(output.chunks_exact(4).all(|b| f32::from_le_bytes(b.try_into().unwrap()) == 0.));
    }

    #[test]
    fn mono_samples_are_duplicated_into_both_channels() {
        let src = spec(44100, AudioFormat::S16Lsb, 1);
        let dst = spec(44100, AudioFormat::S16Lsb, 2);
        let cvt = AudioCvt::build(&src, &dst).unwrap().unwrap();
        let output = cvt.convert(&1000i16.to_le_bytes());
        assert_eq!(output, [1000i16, 1000].iter().flat_map(|s| s.to_le_bytes()).collect::<Vec<_>>());
    }

    #[test]
    fn byte_order_is_swapped() {
        let src = spec(44100, AudioFormat::S16Msb, 1);
        let dst = spec(44100, AudioFormat::S16Lsb, 1);
        let cvt = AudioCvt::build(&src, &dst).unwrap().unwrap();
        assert_eq!(cvt.convert(&(-1234i16).to_be_bytes()), (-1234i16).to_le_bytes());
    }
}
