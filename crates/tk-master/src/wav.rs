//! WAV encoding for 16-bit mono PCM.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Convert a float sample in [-1, 1] to 16-bit PCM, clipping outside.
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn write_samples<W: Write + Seek>(mut writer: WavWriter<W>, samples: &[f32]) -> Result<(), hound::Error> {
    for &s in samples {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()
}

/// Write `samples` to a WAV file at `path`.
pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let writer = WavWriter::create(path, spec(sample_rate))?;
    write_samples(writer, samples)
}

/// Encode `samples` as an in-memory WAV file.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::new());
    let writer = WavWriter::new(&mut cursor, spec(sample_rate))?;
    write_samples(writer, samples)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_describes_mono_16_bit() {
        let wav = samples_to_wav(&[0.0, 0.5, -0.5, 1.0], 48000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // channels, then sample rate, in the fmt chunk
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 48000);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[test]
    fn samples_are_clipped() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn file_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        write_wav(&path, &[0.25, -0.25], 22050).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        let read: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(read, [to_i16(0.25), to_i16(-0.25)]);
    }
}
