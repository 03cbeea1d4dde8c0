use super::{AudioFormat, AudioSpec};
use anyhow::{anyhow, bail, Context, Result};
use std::{fs, io::Cursor, path::Path};
use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    conv::ConvertibleSample,
    io::MediaSourceStream,
    probe::Hint,
};

/// Decoded samples, interleaved, in the narrowest format that holds the
/// source without loss.
enum Pcm {
    U8(Vec<u8>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
}

impl Pcm {
    fn for_buffer(buffer: &AudioBufferRef) -> Self {
        use AudioBufferRef::*;
        match buffer {
            U8(_) => Self::U8(Vec::new()),
            S8(_) | U16(_) | S16(_) => Self::S16(Vec::new()),
            U24(_) | S24(_) | U32(_) | S32(_) => Self::S32(Vec::new()),
            F32(_) | F64(_) => Self::F32(Vec::new()),
        }
    }

    fn append(&mut self, buffer: AudioBufferRef) {
        fn copy<S: ConvertibleSample>(samples: &mut Vec<S>, buffer: AudioBufferRef) {
            let mut dest = SampleBuffer::<S>::new(buffer.capacity() as u64, *buffer.spec());
            dest.copy_interleaved_ref(buffer);
            samples.extend_from_slice(dest.samples());
        }
        match self {
            Self::U8(samples) => copy(samples, buffer),
            Self::S16(samples) => copy(samples, buffer),
            Self::S32(samples) => copy(samples, buffer),
            Self::F32(samples) => copy(samples, buffer),
        }
    }

    fn into_bytes(self) -> (AudioFormat, Vec<u8>) {
        match self {
            Self::U8(samples) => (AudioFormat::U8, samples),
            Self::S16(samples) => (
                AudioFormat::S16Lsb,
                samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            ),
            Self::S32(samples) => (
                AudioFormat::S32Lsb,
                samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            ),
            Self::F32(samples) => (
                AudioFormat::F32Lsb,
                samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            ),
        }
    }
}

/// Decodes a WAV file into raw interleaved bytes and the spec they are in.
pub fn load(path: &Path) -> Result<(AudioSpec, Vec<u8>)> {
    let data = fs::read(path).context("cannot read file")?;
    decode(data)
}

pub fn decode(data: Vec<u8>) -> Result<(AudioSpec, Vec<u8>)> {
    let codecs = symphonia::default::get_codecs();
    let probe = symphonia::default::get_probe();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("wav");
    let mut format_reader = probe
        .format(&hint, mss, &Default::default(), &Default::default())?
        .format;
    let track = format_reader
        .default_track()
        .ok_or_else(|| anyhow!("default track not found"))?;
    let track_id = track.id;
    let codec_params = &track.codec_params;
    let freq = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate"))?;
    let mut channels = codec_params.channels.map(|it| it.count() as u16);
    let mut decoder = codecs.make(codec_params, &Default::default())?;

    let mut pcm: Option<Pcm> = None;
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(error))
                if error.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(error) => bail!(error),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let buffer = decoder.decode(&packet)?;
        channels.get_or_insert(buffer.spec().channels.count() as u16);
        pcm.get_or_insert_with(|| Pcm::for_buffer(&buffer))
            .append(buffer);
    }

    let channels = channels.ok_or_else(|| anyhow!("unknown channel count"))?;
    let (format, bytes) = pcm.unwrap_or(Pcm::S16(Vec::new())).into_bytes();
    Ok((
        AudioSpec {
            freq,
            format,
            channels,
            samples: 0,
        },
        bytes,
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a PCM16 little-endian WAV file in memory.
    pub(crate) fn wav_bytes(freq: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&freq.to_le_bytes());
        out.extend_from_slice(&(freq * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
        out
    }

    #[test]
    fn decodes_pcm16_stereo() {
        let samples: Vec<i16> = (0..64).map(|i| i * 10 - 300).collect();
        let (spec, bytes) = decode(wav_bytes(22050, 2, &samples)).unwrap();
        assert_eq!(spec.freq, 22050);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.format, AudioFormat::S16Lsb);
        let expected: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"definitely not a wav file".to_vec()).is_err());
    }

    #[test]
    fn missing_file_is_rejected() {
        let err = load(Path::new("/nonexistent/sound.wav")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read file"));
    }
}
