//! Runtime configuration
//!
//! Every field has a default; a JSON file may override any subset.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::{DEFAULT_FFT_SIZE, DEFAULT_MAX_DB, DEFAULT_MIN_DB, DEFAULT_SAMPLE_RATE, DEFAULT_SMOOTHING};
use crate::error::{EqError, Result};

/// Tunables shared by the page and control-surface contexts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqConfig {
    /// Audio context sample rate (Hz)
    pub sample_rate: u32,
    /// Analyser FFT window (power of two)
    pub analyser_fft_size: usize,
    /// Analyser smoothing time constant (0..=1)
    pub analyser_smoothing: f64,
    /// Analyser byte-scale floor (dB)
    pub analyser_min_db: f64,
    /// Analyser byte-scale ceiling (dB)
    pub analyser_max_db: f64,
    /// Spectrum sampler polling cadence (ms)
    pub spectrum_poll_ms: u64,
    /// Response-curve sweep resolution
    pub curve_points: usize,
    /// Top of the response plot (dB)
    pub plot_db_top: f64,
    /// Bottom of the response plot (dB)
    pub plot_db_bottom: f64,
    /// Minimum distance between frequency knobs (% of axis)
    pub knob_gap_percent: f64,
    /// Preamp value that maps to unity gain (dB)
    pub preamp_center_db: f64,
    /// Ticks per animated slider move
    pub animation_steps: usize,
    /// Delay between animation ticks (ms, 0 = no delay)
    pub animation_frame_ms: u64,
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            analyser_fft_size: DEFAULT_FFT_SIZE,
            analyser_smoothing: DEFAULT_SMOOTHING,
            analyser_min_db: DEFAULT_MIN_DB,
            analyser_max_db: DEFAULT_MAX_DB,
            spectrum_poll_ms: 50,
            curve_points: 512,
            plot_db_top: 31.0,
            plot_db_bottom: -31.0,
            knob_gap_percent: 5.0,
            preamp_center_db: 0.0,
            animation_steps: 15,
            animation_frame_ms: 10,
        }
    }
}

impl EqConfig {
    /// Load configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EqConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Err(EqError::InvalidConfig { reason });

        if self.sample_rate < 8000 {
            return fail(format!("sample_rate {} below 8000 Hz", self.sample_rate));
        }
        if !self.analyser_fft_size.is_power_of_two() || !(32..=32768).contains(&self.analyser_fft_size) {
            return fail(format!(
                "analyser_fft_size {} must be a power of two in 32..=32768",
                self.analyser_fft_size
            ));
        }
        if !(0.0..=1.0).contains(&self.analyser_smoothing) {
            return fail(format!("analyser_smoothing {} outside 0..=1", self.analyser_smoothing));
        }
        if self.analyser_min_db >= self.analyser_max_db {
            return fail("analyser_min_db must be below analyser_max_db".to_string());
        }
        if self.spectrum_poll_ms == 0 {
            return fail("spectrum_poll_ms must be positive".to_string());
        }
        if self.curve_points < 2 {
            return fail("curve_points must be at least 2".to_string());
        }
        if self.plot_db_top <= self.plot_db_bottom {
            return fail("plot_db_top must be above plot_db_bottom".to_string());
        }
        // Three knobs and two gaps must fit on the axis
        if !(0.0..50.0).contains(&self.knob_gap_percent) {
            return fail(format!("knob_gap_percent {} outside 0..50", self.knob_gap_percent));
        }
        if self.animation_steps == 0 {
            return fail("animation_steps must be positive".to_string());
        }
        Ok(())
    }

    pub fn spectrum_poll_interval(&self) -> Duration {
        Duration::from_millis(self.spectrum_poll_ms)
    }

    pub fn animation_frame(&self) -> Duration {
        Duration::from_millis(self.animation_frame_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        assert!(EqConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"spectrum_poll_ms": 100, "curve_points": 64}}"#).unwrap();

        let config = EqConfig::load(file.path()).unwrap();
        assert_eq!(config.spectrum_poll_ms, 100);
        assert_eq!(config.curve_points, 64);
        assert_eq!(config.sample_rate, 48000);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"analyser_fft_size": 300}}"#).unwrap();

        let err = EqConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_load_missing_file() {
        let err = EqConfig::load(Path::new("/nonexistent/tabeq.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
