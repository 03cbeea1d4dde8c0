/// Sample layout of an audio buffer. Discriminants match the native audio
/// format tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AudioFormat {
    U8 = 0x0008,
    S8 = 0x8008,
    U16Lsb = 0x0010,
    S16Lsb = 0x8010,
    U16Msb = 0x1010,
    S16Msb = 0x9010,
    S32Lsb = 0x8020,
    S32Msb = 0x9020,
    F32Lsb = 0x8120,
    F32Msb = 0x9120,
}

impl AudioFormat {
    #[cfg(target_endian = "little")]
    pub const U16_SYS: Self = Self::U16Lsb;
    #[cfg(target_endian = "little")]
    pub const S16_SYS: Self = Self::S16Lsb;
    #[cfg(target_endian = "little")]
    pub const F32_SYS: Self = Self::F32Lsb;

    #[cfg(target_endian = "big")]
    pub const U16_SYS: Self = Self::U16Msb;
    #[cfg(target_endian = "big")]
    pub const S16_SYS: Self = Self::S16Msb;
    #[cfg(target_endian = "big")]
    pub const F32_SYS: Self = Self::F32Msb;

    #[inline]
    pub fn bits(self) -> usize {
        (self as u16 & 0xFF) as usize
    }

    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        self.bits() / 8
    }

    #[inline]
    pub fn is_float(self) -> bool {
        self as u16 & 0x0100 != 0
    }

    #[inline]
    pub fn is_big_endian(self) -> bool {
        self as u16 & 0x1000 != 0
    }

    #[inline]
    pub fn is_signed(self) -> bool {
        self as u16 & 0x8000 != 0
    }

    /// Byte value a buffer in this format is filled with to produce silence.
    pub fn silence(self) -> u8 {
        match self {
            Self::U8 => 0x80,
            _ => 0x00,
        }
    }
}

/// Describes an audio stream, either requested from or opened by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub freq: u32,
    pub format: AudioFormat,
    pub channels: u16,
    /// Buffer size in sample frames.
    pub samples: u16,
}

impl AudioSpec {
    pub fn silence(&self) -> u8 {
        self.format.silence()
    }

    pub fn frame_size(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Size in bytes of one callback buffer.
    pub fn buffer_size(&self) -> usize {
        self.frame_size() * self.samples as usize
    }

    pub(crate) fn same_layout(&self, other: &AudioSpec) -> bool {
        self.freq == other.freq && self.format == other.format && self.channels == other.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bits_and_flags() {
        assert_eq!(AudioFormat::U8.bytes_per_sample(), 1);
        assert_eq!(AudioFormat::S16Msb.bytes_per_sample(), 2);
        assert_eq!(AudioFormat::F32Lsb.bytes_per_sample(), 4);
        assert!(AudioFormat::F32Msb.is_float());
        assert!(AudioFormat::F32Msb.is_big_endian());
        assert!(!AudioFormat::U16Lsb.is_signed());
        assert!(AudioFormat::S32Lsb.is_signed());
    }

    #[test]
    fn buffer_size_counts_every_channel() {
        let spec = AudioSpec {
            freq: 44100,
            format: AudioFormat::S16Lsb,
            channels: 2,
            samples: 512,
        };
        assert_eq!(spec.frame_size(), 4);
        assert_eq!(spec.buffer_size(), 2048);
        assert_eq!(spec.silence(), 0);
    }
}
