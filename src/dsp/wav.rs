//! WAV file I/O
//!
//! Reads any integer or float WAV into an `AudioBuffer` at its native rate
//! and writes 16/24/32-bit output.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{AudioBuffer, ChannelLayout};
use crate::error::{EqError, Result};

/// Read a mono or stereo WAV file
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        EqError::InvalidParameter {
            param: "channels".to_string(),
            value: spec.channels.to_string(),
            expected: "mono or stereo".to_string(),
        }
    })?;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    AudioBuffer::from_interleaved(&samples, layout, spec.sample_rate)
}

/// Write the buffer as a WAV file with the given bit depth (16, 24 or 32 float)
pub fn write_wav(buffer: &AudioBuffer, path: &Path, bit_depth: u16) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: bit_depth,
        sample_format: if bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    let interleaved = buffer.to_interleaved();

    match bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled)?;
            }
        }
        32 => {
            for sample in interleaved {
                writer.write_sample(sample)?;
            }
        }
        other => {
            return Err(EqError::InvalidParameter {
                param: "bit_depth".to_string(),
                value: other.to_string(),
                expected: "16, 24 or 32".to_string(),
            });
        }
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_write_then_read_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = AudioBuffer::sine(440.0, 0.5, 4800, ChannelLayout::Stereo, 44100);

        write_wav(&buffer, &path, 32).unwrap();
        let loaded = read_wav(&path).unwrap();

        assert_eq!(loaded.sample_rate, 44100);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.len(), 4800);
        assert_abs_diff_eq!(loaded.rms_db(), buffer.rms_db(), epsilon = 1e-4);
    }

    #[test]
    fn test_sixteen_bit_quantization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone16.wav");
        let buffer = AudioBuffer::sine(1000.0, 0.25, 480, ChannelLayout::Mono, 48000);

        write_wav(&buffer, &path, 16).unwrap();
        let loaded = read_wav(&path).unwrap();
        assert_abs_diff_eq!(loaded.rms_db(), buffer.rms_db(), epsilon = 0.01);
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = AudioBuffer::new(16, ChannelLayout::Mono, 48000);
        assert!(write_wav(&buffer, &dir.path().join("x.wav"), 12).is_err());
    }
}
