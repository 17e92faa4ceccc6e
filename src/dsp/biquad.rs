//! Biquad tone filters
//!
//! Low shelf, peaking and high shelf sections using the Audio EQ Cookbook
//! formulas with the audio-engine conventions: gain in dB is native to the
//! filter, shelves use a fixed slope (S = 1) and ignore Q.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::AudioBuffer;
use crate::settings::Band;

/// Filter shape of a tone band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Boost/cut below frequency
    LowShelf,
    /// Bell curve boost/cut around frequency
    Peaking,
    /// Boost/cut above frequency
    HighShelf,
}

impl From<Band> for FilterKind {
    fn from(band: Band) -> Self {
        match band {
            Band::Bass => FilterKind::LowShelf,
            Band::Mid => FilterKind::Peaking,
            Band::Treble => FilterKind::HighShelf,
        }
    }
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoeffs {
    /// Pass-through section
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate coefficients
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub fn calculate(
        kind: FilterKind,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Clamp frequency to valid range (below Nyquist)
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Peaking => {
                let alpha = sin_w0 / (2.0 * q.max(1e-4));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                // S = 1 shelf slope
                let alpha = sin_w0 / 2.0 * 2.0_f64.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterKind::HighShelf => {
                let alpha = sin_w0 / 2.0 * 2.0_f64.sqrt();
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        // Normalize by a0
        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Linear magnitude |H(e^jw)| at `frequency`
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let numerator = Complex64::new(self.b0, 0.0) + z1 * self.b1 + z2 * self.b2;
        let denominator = Complex64::new(1.0, 0.0) + z1 * self.a1 + z2 * self.a2;
        (numerator / denominator).norm()
    }
}

/// Biquad filter history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Direct Form I
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// A live tone-filter node with settable frequency, gain and Q
#[derive(Debug, Clone)]
pub struct BiquadNode {
    kind: FilterKind,
    sample_rate: f64,
    frequency: f64,
    gain_db: f64,
    q: f64,
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
    coeffs_dirty: bool,
}

impl BiquadNode {
    pub fn new(kind: FilterKind, sample_rate: f64, frequency: f64) -> Self {
        Self {
            kind,
            sample_rate,
            frequency,
            gain_db: 0.0,
            q: 1.0,
            coeffs: BiquadCoeffs::IDENTITY,
            states: Vec::new(),
            coeffs_dirty: true,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        if self.frequency != frequency {
            self.frequency = frequency;
            self.coeffs_dirty = true;
        }
    }

    pub fn set_gain_db(&mut self, gain_db: f64) {
        if self.gain_db != gain_db {
            self.gain_db = gain_db;
            self.coeffs_dirty = true;
        }
    }

    pub fn set_q(&mut self, q: f64) {
        if self.q != q {
            self.q = q;
            self.coeffs_dirty = true;
        }
    }

    /// Current coefficients (recomputed lazily after a parameter change)
    pub fn coeffs(&mut self) -> BiquadCoeffs {
        if self.coeffs_dirty {
            self.coeffs = BiquadCoeffs::calculate(
                self.kind,
                self.sample_rate,
                self.frequency,
                self.gain_db,
                self.q,
            );
            self.coeffs_dirty = false;
        }
        self.coeffs
    }

    /// Linear magnitude at each of `frequencies`
    pub fn magnitude_response(&mut self, frequencies: &[f64]) -> Vec<f64> {
        let coeffs = self.coeffs();
        frequencies
            .iter()
            .map(|&f| coeffs.magnitude(f, self.sample_rate))
            .collect()
    }

    /// Filter the buffer in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        let coeffs = self.coeffs();
        if self.states.len() != buffer.channels() {
            self.states.resize_with(buffer.channels(), BiquadState::default);
        }
        for (channel, state) in buffer.samples.iter_mut().zip(self.states.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = state.process(*sample as f64, &coeffs) as f32;
            }
        }
    }

    /// Clear filter history
    pub fn reset(&mut self) {
        self.states.clear();
    }
}
