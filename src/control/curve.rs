//! Response Curve Engine
//!
//! Visualization-only magnitude response of each band, evaluated over a
//! fixed log sweep with the same biquad math the page graph uses. Runs in
//! the control-surface context and never touches the live graph.
//!
//! Plot mapping for a `width x height` area:
//! - `x = log10(f / 20) / log10(1000) * width`
//! - `y = (top_db - db) / (top_db - bottom_db) * height`, dB clamped to the plot range

use serde::Serialize;

use crate::config::EqConfig;
use crate::dsp::{BiquadCoeffs, FilterKind};
use crate::math::{clamp, db_to_plot_fraction, freq_to_plot_fraction, linear_to_db, log_sweep};
use crate::settings::{Band, EqualizerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

/// One band's response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCurve {
    pub band: Band,
    /// Response in dB at each sweep frequency
    pub db: Vec<f64>,
    /// Polyline in plot coordinates
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone)]
pub struct ResponseCurves {
    sweep: Vec<f64>,
    sample_rate: f64,
    top_db: f64,
    bottom_db: f64,
}

impl ResponseCurves {
    pub fn new(config: &EqConfig) -> Self {
        Self {
            sweep: log_sweep(config.curve_points),
            sample_rate: config.sample_rate as f64,
            top_db: config.plot_db_top,
            bottom_db: config.plot_db_bottom,
        }
    }

    /// Sweep frequencies (Hz), ascending
    pub fn sweep(&self) -> &[f64] {
        &self.sweep
    }

    fn coeffs(&self, band: Band, settings: &EqualizerSettings) -> BiquadCoeffs {
        BiquadCoeffs::calculate(
            FilterKind::from(band),
            self.sample_rate,
            settings.freq(band),
            settings.gain(band),
            settings.mid_q,
        )
    }

    /// Band response in dB (`20 * log10(|H|)`) at each sweep frequency
    pub fn band_response_db(&self, band: Band, settings: &EqualizerSettings) -> Vec<f64> {
        let coeffs = self.coeffs(band, settings);
        self.sweep
            .iter()
            .map(|&f| linear_to_db(coeffs.magnitude(f, self.sample_rate)))
            .collect()
    }

    /// Cascaded response of all three bands in dB
    ///
    /// Optional alternative view; the default plot draws bands separately.
    pub fn composite_response_db(&self, settings: &EqualizerSettings) -> Vec<f64> {
        let mut total = vec![0.0; self.sweep.len()];
        for band in Band::ALL {
            for (sum, db) in total.iter_mut().zip(self.band_response_db(band, settings)) {
                *sum += db;
            }
        }
        total
    }

    /// Map a frequency/dB pair into a `width x height` plot
    pub fn to_plot(&self, freq: f64, db: f64, width: f64, height: f64) -> PlotPoint {
        let db = if db.is_finite() {
            clamp(db, self.bottom_db, self.top_db)
        } else {
            self.bottom_db
        };
        PlotPoint {
            x: freq_to_plot_fraction(freq) * width,
            y: db_to_plot_fraction(db, self.top_db, self.bottom_db) * height,
        }
    }

    fn polyline(&self, db: &[f64], width: f64, height: f64) -> Vec<PlotPoint> {
        self.sweep
            .iter()
            .zip(db)
            .map(|(&f, &d)| self.to_plot(f, d, width, height))
            .collect()
    }

    pub fn band_curve(
        &self,
        band: Band,
        settings: &EqualizerSettings,
        width: f64,
        height: f64,
    ) -> BandCurve {
        let db = self.band_response_db(band, settings);
        let points = self.polyline(&db, width, height);
        BandCurve { band, db, points }
    }

    /// The three independent band curves, bass first
    pub fn curves(&self, settings: &EqualizerSettings, width: f64, height: f64) -> Vec<BandCurve> {
        Band::ALL
            .iter()
            .map(|&band| self.band_curve(band, settings, width, height))
            .collect()
    }

    pub fn composite_curve(
        &self,
        settings: &EqualizerSettings,
        width: f64,
        height: f64,
    ) -> Vec<PlotPoint> {
        let db = self.composite_response_db(settings);
        self.polyline(&db, width, height)
    }
}

impl Default for ResponseCurves {
    fn default() -> Self {
        Self::new(&EqConfig::default())
    }
}
