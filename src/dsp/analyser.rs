//! Analyser tap
//!
//! Captures the graph output and produces byte-scaled (0-255) frequency
//! magnitudes for the bar visualizer: Blackman window, FFT, exponential
//! smoothing across calls, then dB mapped linearly onto `[min_db, max_db]`.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use super::AudioBuffer;
use crate::error::{EqError, Result};

/// Default FFT window size
pub const DEFAULT_FFT_SIZE: usize = 256;

/// Default smoothing time constant
pub const DEFAULT_SMOOTHING: f64 = 0.8;

/// Default dB floor of the byte scale
pub const DEFAULT_MIN_DB: f64 = -100.0;

/// Default dB ceiling of the byte scale
pub const DEFAULT_MAX_DB: f64 = -30.0;

/// Output-side spectrum tap of the audio graph
pub struct Analyser {
    fft: Arc<dyn Fft<f64>>,
    fft_size: usize,
    smoothing: f64,
    min_db: f64,
    max_db: f64,
    /// Pre-computed Blackman window
    window: Vec<f64>,
    /// Ring of the most recent mono samples
    ring: Vec<f32>,
    write_pos: usize,
    /// Smoothed magnitudes from the previous call
    previous: Vec<f64>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish()
    }
}

impl Analyser {
    /// Create an analyser
    ///
    /// `fft_size` must be a power of two between 32 and 32768 and
    /// `min_db < max_db`.
    pub fn new(fft_size: usize, smoothing: f64, min_db: f64, max_db: f64) -> Result<Self> {
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return Err(EqError::InvalidParameter {
                param: "fft_size".to_string(),
                value: fft_size.to_string(),
                expected: "power of two in 32..=32768".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(EqError::InvalidParameter {
                param: "smoothing".to_string(),
                value: smoothing.to_string(),
                expected: "0.0 to 1.0".to_string(),
            });
        }
        if min_db >= max_db {
            return Err(EqError::InvalidParameter {
                param: "min_db".to_string(),
                value: min_db.to_string(),
                expected: format!("below max_db ({})", max_db),
            });
        }

        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let window = (0..fft_size)
            .map(|n| {
                let x = n as f64 / fft_size as f64;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Ok(Self {
            fft,
            fft_size,
            smoothing,
            min_db,
            max_db,
            window,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            previous: vec![0.0; fft_size / 2],
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins returned by `byte_frequency_data`
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Record a block of graph output
    pub fn capture(&mut self, buffer: &AudioBuffer) {
        for index in 0..buffer.len() {
            self.ring[self.write_pos] = buffer.mono_sample(index);
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Byte-scaled magnitudes of the most recent `fft_size` samples
    pub fn byte_frequency_data(&mut self) -> Vec<u8> {
        let mut spectrum: Vec<Complex64> = (0..self.fft_size)
            .map(|i| {
                // Oldest sample first
                let sample = self.ring[(self.write_pos + i) % self.fft_size] as f64;
                Complex64::new(sample * self.window[i], 0.0)
            })
            .collect();
        self.fft.process(&mut spectrum);

        let scale = 1.0 / self.fft_size as f64;
        let range = self.max_db - self.min_db;
        let mut bytes = Vec::with_capacity(self.frequency_bin_count());

        for (bin, previous) in self.previous.iter_mut().enumerate() {
            let magnitude = spectrum[bin].norm() * scale;
            let smoothed = self.smoothing * *previous + (1.0 - self.smoothing) * magnitude;
            *previous = if smoothed.is_finite() { smoothed } else { 0.0 };

            let db = if *previous > 0.0 {
                20.0 * previous.log10()
            } else {
                f64::NEG_INFINITY
            };
            let scaled = (255.0 / range * (db - self.min_db)).floor();
            bytes.push(scaled.clamp(0.0, 255.0) as u8);
        }

        bytes
    }

    /// Forget captured audio and smoothing history
    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.previous.fill(0.0);
        self.write_pos = 0;
    }
}
