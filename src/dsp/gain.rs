//! Gain Node
//!
//! Broadband multiplicative stage. The graph keeps two of them in cascade:
//! preamp (dB control converted to linear) and master (percent / 100).

use super::AudioBuffer;
use crate::math::db_to_linear;

/// Broadband linear gain stage
#[derive(Debug, Clone, PartialEq)]
pub struct GainNode {
    gain: f64,
}

impl GainNode {
    /// Create a stage with the given linear multiplier
    pub fn new(gain: f64) -> Self {
        Self {
            gain: gain.max(0.0),
        }
    }

    /// Create a stage from a dB value
    pub fn from_db(db: f64) -> Self {
        Self::new(db_to_linear(db))
    }

    /// Current linear multiplier
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Set the linear multiplier (negative values are treated as 0)
    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain.max(0.0);
    }

    pub fn is_unity(&self) -> bool {
        (self.gain - 1.0).abs() < f64::EPSILON
    }

    pub fn process(&self, buffer: &mut AudioBuffer) {
        // Unity gain optimization
        if self.is_unity() {
            return;
        }
        let gain = self.gain as f32;
        for channel in &mut buffer.samples {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new(1.0)
    }
}
