use super::AudioFormat;

/// Full volume for [`mix_audio`].
pub const MAX_VOLUME: u8 = 128;

macro_rules! mix_int {
    ($ty:ty, $wide:ty, $dst:expr, $src:expr, $format:expr, $volume:expr, $bias:expr) => {{
        const N: usize = std::mem::size_of::<$ty>();
        let big = $format.is_big_endian();
        for (d, s) in $dst.chunks_exact_mut(N).zip($src.chunks_exact(N)) {
            let (a, b): ([u8; N], [u8; N]) = (
                d.try_into().unwrap_or_default(),
                s.try_into().unwrap_or_default(),
            );
            let (a, b) = if big {
                (<$ty>::from_be_bytes(a), <$ty>::from_be_bytes(b))
            } else {
                (<$ty>::from_le_bytes(a), <$ty>::from_le_bytes(b))
            };
            let b = (b as $wide - $bias) * $volume as $wide / MAX_VOLUME as $wide;
            let mixed = (a as $wide - $bias + b).clamp(
                <$ty>::MIN as $wide - $bias,
                <$ty>::MAX as $wide - $bias,
            ) + $bias;
            let mixed = mixed as $ty;
            d.copy_from_slice(&if big {
                mixed.to_be_bytes()
            } else {
                mixed.to_le_bytes()
            });
        }
    }};
}

/// Mixes `src` into `dst` at `volume` (0..=[`MAX_VOLUME`]) with clipping.
/// Only the common prefix of whole samples is touched.
pub fn mix_audio(dst: &mut [u8], src: &[u8], format: AudioFormat, volume: u8) {
    if volume == 0 {
        return;
    }
    let volume = volume.min(MAX_VOLUME);
    let len = dst.len().min(src.len());
    let (dst, src) = (&mut dst[..len], &src[..len]);
    use AudioFormat::*;
    match format {
        U8 => mix_int!(u8, i32, dst, src, format, volume, 128),
        S8 => mix_int!(i8, i32, dst, src, format, volume, 0),
        U16Lsb | U16Msb => mix_int!(u16, i32, dst, src, format, volume, 32768),
        S16Lsb | S16Msb => mix_int!(i16, i32, dst, src, format, volume, 0),
        S32Lsb | S32Msb => mix_int!(i32, i64, dst, src, format, volume, 0),
        F32Lsb | F32Msb => {
            let big = format.is_big_endian();
            let scale = volume as f32 / MAX_VOLUME as f32;
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let (a, b): ([u8; 4], [u8; 4]) = (
                    d.try_into().unwrap_or_default(),
                    s.try_into().unwrap_or_default(),
                );
                let (a, b) = if big {
                    (f32::from_be_bytes(a), f32::from_be_bytes(b))
                } else {
                    (f32::from_le_bytes(a), f32::from_le_bytes(b))
                };
                let mixed = (a + b * scale).clamp(-1., 1.);
                d.copy_from_slice(&if big {
                    mixed.to_be_bytes()
                } else {
                    mixed.to_le_bytes()
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn s16_adds_and_clips() {
        let mut dst = s16(&[100, 30000, -30000]);
        mix_audio(&mut dst, &s16(&[50, 10000, -10000]), AudioFormat::S16Lsb, MAX_VOLUME);
        assert_eq!(dst, s16(&[150, i16::MAX, i16::MIN]));
    }

    #[test]
    fn volume_scales_source() {
        let mut dst = s16(&[0]);
        mix_audio(&mut dst, &s16(&[1000]), AudioFormat::S16Lsb, MAX_VOLUME / 2);
        assert_eq!(dst, s16(&[500]));
    }

    #[test]
    fn u8_mixes_around_silence() {
        let mut dst = vec![0x80, 0x80, 250];
        mix_audio(&mut dst, &[0x90, 0x70, 250], AudioFormat::U8, MAX_VOLUME);
        assert_eq!(dst, vec![0x90, 0x70, 255]);
    }

    #[test]
    fn shorter_source_leaves_tail_untouched() {
        let mut dst = s16(&[1, 2, 3]);
        mix_audio(&mut dst, &s16(&[1]), AudioFormat::S16Lsb, MAX_VOLUME);
        assert_eq!(dst, s16(&[2, 2, 3]));
    }

    #[test]
    fn f32_clamps_to_unit_range() {
        let mut dst: Vec<u8> = 0.75f32.to_le_bytes().to_vec();
        mix_audio(&mut dst, &0.5f32.to_le_bytes(), AudioFormat::F32Lsb, MAX_VOLUME);
        assert_eq!(f32::from_le_bytes(dst[..].try_into().unwrap()), 1.);
    }
}
