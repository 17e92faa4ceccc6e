//! Parameter Math
//!
//! Pure conversions between user-facing control values (decibels,
//! percentages, slider positions) and audio-engine parameters.

// ============================================================================
// Constants
// ============================================================================

/// Lowest frequency on the knob axis and response sweep (Hz)
pub const MIN_FREQ_HZ: f64 = 20.0;

/// Highest frequency on the knob axis and response sweep (Hz)
pub const MAX_FREQ_HZ: f64 = 20000.0;

/// Band gain range in dB
pub const MIN_BAND_DB: f64 = -30.0;
pub const MAX_BAND_DB: f64 = 30.0;

/// Preamp range in dB
pub const MIN_PREAMP_DB: f64 = -30.0;
pub const MAX_PREAMP_DB: f64 = 30.0;

/// Master range in percent of unity
pub const MIN_MASTER_PERCENT: f64 = 0.0;
pub const MAX_MASTER_PERCENT: f64 = 200.0;

/// Peaking filter Q range
pub const MIN_Q: f64 = 0.1;
pub const MAX_Q: f64 = 10.0;

// ============================================================================
// Gain Conversions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `-inf` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Linear multiplier of the preamp stage
///
/// `10^((preamp_db - center_db) / 20)`: a preamp sitting at the configured
/// center is unity gain.
#[inline]
pub fn preamp_to_linear(preamp_db: f64, center_db: f64) -> f64 {
    db_to_linear(clamp(preamp_db, MIN_PREAMP_DB, MAX_PREAMP_DB) - center_db)
}

/// Linear multiplier of the master stage (`percent / 100`)
#[inline]
pub fn master_to_linear(percent: f64) -> f64 {
    clamp(percent, MIN_MASTER_PERCENT, MAX_MASTER_PERCENT) / 100.0
}

// ============================================================================
// Frequency Axis
// ============================================================================

/// Map a knob position (0..=100 %) to a frequency on the log axis
///
/// Rounded to whole Hz, like the knob labels show it.
pub fn percent_to_freq(percent: f64) -> f64 {
    let log_min = MIN_FREQ_HZ.log10();
    let log_max = MAX_FREQ_HZ.log10();
    10.0_f64
        .powf(log_min + (percent / 100.0) * (log_max - log_min))
        .round()
}

/// Map a frequency to its knob position (0..=100 %) on the log axis
pub fn freq_to_percent(freq: f64) -> f64 {
    let log_min = MIN_FREQ_HZ.log10();
    let log_max = MAX_FREQ_HZ.log10();
    (freq.log10() - log_min) / (log_max - log_min) * 100.0
}

/// Horizontal plot fraction (0..=1) of a frequency: `log10(f/20) / log10(1000)`
#[inline]
pub fn freq_to_plot_fraction(freq: f64) -> f64 {
    (freq / MIN_FREQ_HZ).log10() / (MAX_FREQ_HZ / MIN_FREQ_HZ).log10()
}

/// Vertical plot fraction (0 at `top`, 1 at `bottom`) of a dB value
#[inline]
pub fn db_to_plot_fraction(db: f64, top: f64, bottom: f64) -> f64 {
    (top - db) / (top - bottom)
}

/// Logarithmic sweep of `points` frequencies from 20 Hz to 20 kHz inclusive
pub fn log_sweep(points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![MIN_FREQ_HZ],
        n => (0..n)
            .map(|i| {
                let frac = i as f64 / (n - 1) as f64;
                MIN_FREQ_HZ * (MAX_FREQ_HZ / MIN_FREQ_HZ).powf(frac)
            })
            .collect(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Clamp `value` into `[min, max]`
///
/// Unlike `f64::clamp` this never panics when `min > max`; `min` wins, which
/// is what a knob squeezed between two neighbours needs.
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

/// Human-readable frequency label ("60 Hz", "12.0 kHz")
pub fn format_frequency(freq: f64) -> String {
    if freq >= 1000.0 {
        format!("{:.1} kHz", freq / 1000.0)
    } else {
        format!("{} Hz", freq.round() as i64)
    }
}
