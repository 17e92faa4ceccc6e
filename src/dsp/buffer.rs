//! Audio Buffer
//!
//! Non-interleaved 32-bit float blocks that flow through the page's filter
//! graph.

use serde::{Deserialize, Serialize};

use crate::error::{EqError, Result};
use crate::math::linear_to_db;

/// Default audio context sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Block of audio, one `Vec<f32>` per channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Create a buffer holding a sine tone on every channel
    pub fn sine(
        frequency: f64,
        amplitude: f32,
        num_samples: usize,
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        let mut buffer = Self::new(num_samples, layout, sample_rate);
        let angular = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;
        for channel in &mut buffer.samples {
            for (i, sample) in channel.iter_mut().enumerate() {
                *sample = amplitude * (angular * i as f64).sin() as f32;
            }
        }
        buffer
    }

    /// Create an audio buffer from interleaved sample data
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(EqError::InvalidParameter {
                param: "interleaved".to_string(),
                value: interleaved.len().to_string(),
                expected: format!("a multiple of {} samples", num_channels),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ...)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.channels() * self.len());
        for index in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[index]);
            }
        }
        interleaved
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Zero every sample
    pub fn silence(&mut self) {
        for channel in &mut self.samples {
            channel.fill(0.0);
        }
    }

    /// Mono downmix (channel average) of sample `index`
    pub fn mono_sample(&self, index: usize) -> f32 {
        let channels = self.channels();
        if channels == 0 {
            return 0.0;
        }
        self.samples.iter().map(|ch| ch[index]).sum::<f32>() / channels as f32
    }

    /// RMS level across all channels in dB (`-inf` for silence)
    pub fn rms_db(&self) -> f64 {
        let total = self.channels() * self.len();
        if total == 0 {
            return f64::NEG_INFINITY;
        }
        let sum_squares: f64 = self
            .samples
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        linear_to_db((sum_squares / total as f64).sqrt())
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Check that no sample is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, ChannelLayout::Stereo, DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_interleave_round_trip() {
        let data = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = AudioBuffer::from_interleaved(&data, ChannelLayout::Stereo, 48000).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), data.to_vec());
    }

    #[test]
    fn test_interleaved_length_mismatch() {
        let err = AudioBuffer::from_interleaved(&[0.0; 3], ChannelLayout::Stereo, 48000);
        assert!(err.is_err());
    }

    #[test]
    fn test_sine_levels() {
        let buffer = AudioBuffer::sine(1000.0, 1.0, 48000, ChannelLayout::Mono, 48000);
        // Full-scale sine RMS is -3.01 dBFS
        assert_abs_diff_eq!(buffer.rms_db(), -3.0103, epsilon = 0.01);
        assert!(buffer.peak() <= 1.0);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_silence_and_mono_mix() {
        let mut buffer =
            AudioBuffer::from_interleaved(&[1.0, 0.0, 0.5, 0.5], ChannelLayout::Stereo, 48000)
                .unwrap();
        assert_eq!(buffer.mono_sample(0), 0.5);
        buffer.silence();
        assert_eq!(buffer.rms_db(), f64::NEG_INFINITY);
    }
}
