//! Equalizer data model
//!
//! `EqualizerSettings` is the full per-tab snapshot, `EqUpdate` the partial
//! form that travels over the parameter channel. Both use the wire names
//! `bass, mid, treble, preamp, master, bassFreq, midFreq, trebleFreq, midQ`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EqError, Result};
use crate::math::{
    clamp, MAX_BAND_DB, MAX_FREQ_HZ, MAX_MASTER_PERCENT, MAX_PREAMP_DB, MAX_Q, MIN_BAND_DB,
    MIN_FREQ_HZ, MIN_MASTER_PERCENT, MIN_PREAMP_DB, MIN_Q,
};

/// Default corner/center frequencies (Hz)
pub const DEFAULT_BASS_FREQ: f64 = 60.0;
pub const DEFAULT_MID_FREQ: f64 = 1000.0;
pub const DEFAULT_TREBLE_FREQ: f64 = 12000.0;

/// Default master level (percent of unity)
pub const DEFAULT_MASTER: f64 = 100.0;

/// Default preamp level (dB)
pub const DEFAULT_PREAMP: f64 = 0.0;

/// Default peaking Q
pub const DEFAULT_MID_Q: f64 = 1.0;

// ============================================================================
// Bands and Fields
// ============================================================================

/// One of the three tone bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Low shelf
    Bass,
    /// Peaking
    Mid,
    /// High shelf
    Treble,
}

impl Band {
    /// Bands in axis order
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    /// Storage/wire key of the band ("bass", "mid", "treble")
    pub fn key(&self) -> &'static str {
        match self {
            Band::Bass => "bass",
            Band::Mid => "mid",
            Band::Treble => "treble",
        }
    }

    /// Position on the frequency axis (0 = lowest)
    pub fn index(&self) -> usize {
        match self {
            Band::Bass => 0,
            Band::Mid => 1,
            Band::Treble => 2,
        }
    }

    /// Band at a knob index
    pub fn from_index(index: usize) -> Option<Band> {
        Band::ALL.get(index).copied()
    }

    /// Field carrying this band's gain
    pub fn gain_field(&self) -> EqField {
        match self {
            Band::Bass => EqField::Bass,
            Band::Mid => EqField::Mid,
            Band::Treble => EqField::Treble,
        }
    }

    /// Field carrying this band's frequency
    pub fn freq_field(&self) -> EqField {
        match self {
            Band::Bass => EqField::BassFreq,
            Band::Mid => EqField::MidFreq,
            Band::Treble => EqField::TrebleFreq,
        }
    }

    pub fn default_freq(&self) -> f64 {
        match self {
            Band::Bass => DEFAULT_BASS_FREQ,
            Band::Mid => DEFAULT_MID_FREQ,
            Band::Treble => DEFAULT_TREBLE_FREQ,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single named equalizer parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqField {
    Bass,
    Mid,
    Treble,
    Preamp,
    Master,
    BassFreq,
    MidFreq,
    TrebleFreq,
    MidQ,
}

impl EqField {
    pub const ALL: [EqField; 9] = [
        EqField::Bass,
        EqField::Mid,
        EqField::Treble,
        EqField::Preamp,
        EqField::Master,
        EqField::BassFreq,
        EqField::MidFreq,
        EqField::TrebleFreq,
        EqField::MidQ,
    ];

    /// Wire name of the field
    pub fn key(&self) -> &'static str {
        match self {
            EqField::Bass => "bass",
            EqField::Mid => "mid",
            EqField::Treble => "treble",
            EqField::Preamp => "preamp",
            EqField::Master => "master",
            EqField::BassFreq => "bassFreq",
            EqField::MidFreq => "midFreq",
            EqField::TrebleFreq => "trebleFreq",
            EqField::MidQ => "midQ",
        }
    }

    /// Fields stored in the `eq_T` tone snapshot (the rest have their own keys)
    pub fn is_tone(&self) -> bool {
        matches!(
            self,
            EqField::Bass | EqField::Mid | EqField::Treble | EqField::Preamp | EqField::Master
        )
    }

    /// Band whose frequency this field carries
    pub fn freq_band(&self) -> Option<Band> {
        match self {
            EqField::BassFreq => Some(Band::Bass),
            EqField::MidFreq => Some(Band::Mid),
            EqField::TrebleFreq => Some(Band::Treble),
            _ => None,
        }
    }

    /// Band whose gain this field carries
    pub fn gain_band(&self) -> Option<Band> {
        match self {
            EqField::Bass => Some(Band::Bass),
            EqField::Mid => Some(Band::Mid),
            EqField::Treble => Some(Band::Treble),
            _ => None,
        }
    }

    /// Valid range of the field
    pub fn range(&self) -> (f64, f64) {
        match self {
            EqField::Bass | EqField::Mid | EqField::Treble => (MIN_BAND_DB, MAX_BAND_DB),
            EqField::Preamp => (MIN_PREAMP_DB, MAX_PREAMP_DB),
            EqField::Master => (MIN_MASTER_PERCENT, MAX_MASTER_PERCENT),
            EqField::BassFreq | EqField::MidFreq | EqField::TrebleFreq => {
                (MIN_FREQ_HZ, MAX_FREQ_HZ)
            }
            EqField::MidQ => (MIN_Q, MAX_Q),
        }
    }

    /// Clamp a value into range, rejecting NaN/Inf
    pub fn normalize(&self, value: f64) -> Result<f64> {
        if !value.is_finite() {
            let (min, max) = self.range();
            return Err(EqError::InvalidParameter {
                param: self.key().to_string(),
                value: value.to_string(),
                expected: format!("{} to {}", min, max),
            });
        }
        let (min, max) = self.range();
        Ok(clamp(value, min, max))
    }
}

impl fmt::Display for EqField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EqField {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        EqField::ALL
            .iter()
            .copied()
            .find(|field| field.key() == s)
            .ok_or_else(|| EqError::UnknownField {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Partial Update
// ============================================================================

/// Partial settings: every field optional, unspecified fields untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treble: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treble_freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid_q: Option<f64>,
}

impl EqUpdate {
    /// Update carrying exactly one field
    pub fn single(field: EqField, value: f64) -> Self {
        let mut update = Self::default();
        update.set(field, value);
        update
    }

    fn slot(&mut self, field: EqField) -> &mut Option<f64> {
        match field {
            EqField::Bass => &mut self.bass,
            EqField::Mid => &mut self.mid,
            EqField::Treble => &mut self.treble,
            EqField::Preamp => &mut self.preamp,
            EqField::Master => &mut self.master,
            EqField::BassFreq => &mut self.bass_freq,
            EqField::MidFreq => &mut self.mid_freq,
            EqField::TrebleFreq => &mut self.treble_freq,
            EqField::MidQ => &mut self.mid_q,
        }
    }

    pub fn get(&self, field: EqField) -> Option<f64> {
        match field {
            EqField::Bass => self.bass,
            EqField::Mid => self.mid,
            EqField::Treble => self.treble,
            EqField::Preamp => self.preamp,
            EqField::Master => self.master,
            EqField::BassFreq => self.bass_freq,
            EqField::MidFreq => self.mid_freq,
            EqField::TrebleFreq => self.treble_freq,
            EqField::MidQ => self.mid_q,
        }
    }

    pub fn set(&mut self, field: EqField, value: f64) {
        *self.slot(field) = Some(value);
    }

    /// Provided fields in canonical order
    pub fn fields(&self) -> impl Iterator<Item = (EqField, f64)> + '_ {
        EqField::ALL
            .iter()
            .filter_map(move |&field| self.get(field).map(|value| (field, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.fields().count()
    }
}

// ============================================================================
// Full Snapshot
// ============================================================================

/// Complete equalizer settings for one tab
///
/// Missing fields deserialize to their defaults, so a partially written
/// snapshot always reads back as a concrete one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqualizerSettings {
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
    pub preamp: f64,
    pub master: f64,
    pub bass_freq: f64,
    pub mid_freq: f64,
    pub treble_freq: f64,
    pub mid_q: f64,
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        Self {
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            preamp: DEFAULT_PREAMP,
            master: DEFAULT_MASTER,
            bass_freq: DEFAULT_BASS_FREQ,
            mid_freq: DEFAULT_MID_FREQ,
            treble_freq: DEFAULT_TREBLE_FREQ,
            mid_q: DEFAULT_MID_Q,
        }
    }
}

impl EqualizerSettings {
    pub fn get(&self, field: EqField) -> f64 {
        match field {
            EqField::Bass => self.bass,
            EqField::Mid => self.mid,
            EqField::Treble => self.treble,
            EqField::Preamp => self.preamp,
            EqField::Master => self.master,
            EqField::BassFreq => self.bass_freq,
            EqField::MidFreq => self.mid_freq,
            EqField::TrebleFreq => self.treble_freq,
            EqField::MidQ => self.mid_q,
        }
    }

    pub fn set(&mut self, field: EqField, value: f64) {
        let slot = match field {
            EqField::Bass => &mut self.bass,
            EqField::Mid => &mut self.mid,
            EqField::Treble => &mut self.treble,
            EqField::Preamp => &mut self.preamp,
            EqField::Master => &mut self.master,
            EqField::BassFreq => &mut self.bass_freq,
            EqField::MidFreq => &mut self.mid_freq,
            EqField::TrebleFreq => &mut self.treble_freq,
            EqField::MidQ => &mut self.mid_q,
        };
        *slot = value;
    }

    pub fn gain(&self, band: Band) -> f64 {
        self.get(band.gain_field())
    }

    pub fn freq(&self, band: Band) -> f64 {
        self.get(band.freq_field())
    }

    /// Overwrite the fields present in `update`
    pub fn merge(&mut self, update: &EqUpdate) {
        for (field, value) in update.fields() {
            self.set(field, value);
        }
    }

    /// Every field as an update (the "whole snapshot" message form)
    pub fn to_update(&self) -> EqUpdate {
        let mut update = EqUpdate::default();
        for field in EqField::ALL {
            update.set(field, self.get(field));
        }
        update
    }

    /// The `eq_T` portion of the snapshot
    pub fn tone(&self) -> ToneSettings {
        ToneSettings {
            bass: self.bass,
            mid: self.mid,
            treble: self.treble,
            preamp: self.preamp,
            master: self.master,
        }
    }

    /// True when `bass < mid < treble` inside the audible range
    pub fn frequencies_ordered(&self) -> bool {
        MIN_FREQ_HZ <= self.bass_freq
            && self.bass_freq < self.mid_freq
            && self.mid_freq < self.treble_freq
            && self.treble_freq <= MAX_FREQ_HZ
    }

    /// Clamp every field into range; unordered frequencies fall back to defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for field in EqField::ALL {
            let value = field
                .normalize(self.get(field))
                .unwrap_or_else(|_| defaults.get(field));
            self.set(field, value);
        }
        if !self.frequencies_ordered() {
            for band in Band::ALL {
                self.set(band.freq_field(), band.default_freq());
            }
        }
        self
    }
}

/// Tone snapshot persisted under `eq_T`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
    pub preamp: f64,
    pub master: f64,
}

impl Default for ToneSettings {
    fn default() -> Self {
        EqualizerSettings::default().tone()
    }
}

impl ToneSettings {
    /// Value of a tone field; frequency and Q fields read as 0
    pub fn get(&self, field: EqField) -> f64 {
        match field {
            EqField::Bass => self.bass,
            EqField::Mid => self.mid,
            EqField::Treble => self.treble,
            EqField::Preamp => self.preamp,
            EqField::Master => self.master,
            _ => 0.0,
        }
    }

    /// Overwrite a tone field; frequency and Q fields are ignored
    pub fn set(&mut self, field: EqField, value: f64) {
        match field {
            EqField::Bass => self.bass = value,
            EqField::Mid => self.mid = value,
            EqField::Treble => self.treble = value,
            EqField::Preamp => self.preamp = value,
            EqField::Master => self.master = value,
            _ => {}
        }
    }

    /// All three band gains are zero
    pub fn is_flat(&self) -> bool {
        self.bass == 0.0 && self.mid == 0.0 && self.treble == 0.0
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Built-in preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresetName {
    BoostReset,
    BoostBass,
    BoostMetal,
    BoostPop,
    BoostSoft,
}

impl PresetName {
    pub const ALL: [PresetName; 5] = [
        PresetName::BoostReset,
        PresetName::BoostBass,
        PresetName::BoostMetal,
        PresetName::BoostPop,
        PresetName::BoostSoft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::BoostReset => "boostReset",
            PresetName::BoostBass => "boostBass",
            PresetName::BoostMetal => "boostMetal",
            PresetName::BoostPop => "boostPop",
            PresetName::BoostSoft => "boostSoft",
        }
    }

    /// Static gain mapping of the preset
    pub fn definition(&self) -> PresetDefinition {
        let (bass, mid, treble) = match self {
            PresetName::BoostReset => (0.0, 0.0, 0.0),
            PresetName::BoostBass => (19.0, -30.0, -30.0),
            PresetName::BoostMetal => (30.0, 0.0, 0.0),
            PresetName::BoostPop => (0.0, 11.0, 30.0),
            PresetName::BoostSoft => (0.0, -30.0, -30.0),
        };
        PresetDefinition {
            name: *self,
            bass,
            mid,
            treble,
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        PresetName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| EqError::UnknownPreset {
                name: s.to_string(),
            })
    }
}

/// Named static band-gain mapping; frequencies, preamp and master are unaffected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetDefinition {
    pub name: PresetName,
    pub bass: f64,
    pub mid: f64,
    pub treble: f64,
}

impl PresetDefinition {
    pub fn gain(&self, band: Band) -> f64 {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }
}

/// Active-preset marker stored under `activePreset_T`
///
/// Serialized as a plain string: a preset name, `"custom"` or `"reset"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActivePreset {
    Preset(PresetName),
    Custom,
    Reset,
}

impl From<ActivePreset> for String {
    fn from(value: ActivePreset) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ActivePreset {
    type Error = EqError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for ActivePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivePreset::Preset(name) => write!(f, "{}", name),
            ActivePreset::Custom => f.write_str("custom"),
            ActivePreset::Reset => f.write_str("reset"),
        }
    }
}

impl FromStr for ActivePreset {
    type Err = EqError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "custom" => Ok(ActivePreset::Custom),
            "reset" => Ok(ActivePreset::Reset),
            other => other.parse().map(ActivePreset::Preset),
        }
    }
}

/// Which control group the configurator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPanel {
    #[default]
    Gain,
    Frequency,
    Quality,
}
