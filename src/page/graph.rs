//! Audio Graph
//!
//! Fixed-topology filter chain built once per page:
//!
//! ```text
//! source(s) -> bass (low shelf) -> mid (peaking) -> treble (high shelf)
//!           -> preamp gain -> master gain -> analyser tap -> output
//! ```
//!
//! The graph keeps the last snapshot it was sent. While disabled every
//! gain-affecting node sits at neutral (0 dB bands, unity preamp/master);
//! re-enabling reapplies the retained snapshot exactly.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Document, InstanceId, NodeId};
use crate::config::EqConfig;
use crate::dsp::{Analyser, AudioBuffer, BiquadNode, FilterKind, GainNode};
use crate::error::Result;
use crate::math::{master_to_linear, preamp_to_linear};
use crate::settings::{Band, EqField, EqUpdate, EqualizerSettings};

/// Values currently set on the graph's nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphParams {
    pub bass_gain_db: f64,
    pub mid_gain_db: f64,
    pub treble_gain_db: f64,
    pub bass_freq: f64,
    pub mid_freq: f64,
    pub treble_freq: f64,
    pub mid_q: f64,
    /// Linear multiplier
    pub preamp_gain: f64,
    /// Linear multiplier
    pub master_gain: f64,
    pub enabled: bool,
    pub suspended: bool,
    pub sources: usize,
}

/// Live equalizer chain of one page
#[derive(Debug)]
pub struct AudioGraph {
    instance: InstanceId,
    bass: BiquadNode,
    mid: BiquadNode,
    treble: BiquadNode,
    preamp: GainNode,
    master: GainNode,
    analyser: Analyser,
    preamp_center_db: f64,
    sources: Vec<NodeId>,
    snapshot: EqualizerSettings,
    enabled: bool,
    suspended: bool,
}

impl AudioGraph {
    /// Build the chain at default settings
    ///
    /// Like a freshly created audio context the graph starts suspended and
    /// renders silence until `resume`.
    pub fn new(instance: InstanceId, config: &EqConfig) -> Result<Self> {
        let sample_rate = config.sample_rate as f64;
        let snapshot = EqualizerSettings::default();

        let mut graph = Self {
            instance,
            bass: BiquadNode::new(FilterKind::LowShelf, sample_rate, snapshot.bass_freq),
            mid: BiquadNode::new(FilterKind::Peaking, sample_rate, snapshot.mid_freq),
            treble: BiquadNode::new(FilterKind::HighShelf, sample_rate, snapshot.treble_freq),
            preamp: GainNode::default(),
            master: GainNode::default(),
            analyser: Analyser::new(
                config.analyser_fft_size,
                config.analyser_smoothing,
                config.analyser_min_db,
                config.analyser_max_db,
            )?,
            preamp_center_db: config.preamp_center_db,
            sources: Vec::new(),
            snapshot,
            enabled: true,
            suspended: true,
        };
        graph.apply_snapshot();

        info!(%instance, sample_rate, "Audio graph constructed");
        Ok(graph)
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    fn band_node(&mut self, band: Band) -> &mut BiquadNode {
        match band {
            Band::Bass => &mut self.bass,
            Band::Mid => &mut self.mid,
            Band::Treble => &mut self.treble,
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Set the provided fields; everything else is left untouched
    ///
    /// Values are clamped into range. Non-finite values are logged and
    /// skipped. While disabled, gain fields only update the retained
    /// snapshot; frequencies and Q always reach the nodes.
    pub fn apply_update(&mut self, update: &EqUpdate) {
        for (field, value) in update.fields() {
            let value = match field.normalize(value) {
                Ok(v) => v,
                Err(err) => {
                    warn!(instance = %self.instance, %field, error = %err, "Ignoring parameter");
                    continue;
                }
            };
            self.snapshot.set(field, value);
            if self.enabled || !Self::affects_gain(field) {
                self.set_node(field, value);
            }
        }
        debug!(instance = %self.instance, fields = update.len(), "Update applied");
    }

    fn affects_gain(field: EqField) -> bool {
        field.is_tone()
    }

    fn set_node(&mut self, field: EqField, value: f64) {
        match field {
            EqField::Bass | EqField::Mid | EqField::Treble => {
                if let Some(band) = field.gain_band() {
                    self.band_node(band).set_gain_db(value);
                }
            }
            EqField::Preamp => self
                .preamp
                .set_gain(preamp_to_linear(value, self.preamp_center_db)),
            EqField::Master => self.master.set_gain(master_to_linear(value)),
            EqField::BassFreq | EqField::MidFreq | EqField::TrebleFreq => {
                if let Some(band) = field.freq_band() {
                    self.band_node(band).set_frequency(value);
                }
            }
            EqField::MidQ => self.mid.set_q(value),
        }
    }

    fn apply_snapshot(&mut self) {
        let snapshot = self.snapshot;
        for field in EqField::ALL {
            self.set_node(field, snapshot.get(field));
        }
    }

    /// Go neutral (`false`) or reapply the retained snapshot (`true`)
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.apply_snapshot();
        } else {
            for band in Band::ALL {
                self.band_node(band).set_gain_db(0.0);
            }
            self.preamp.set_gain(1.0);
            self.master.set_gain(1.0);
        }
        info!(instance = %self.instance, enabled, "Equalizer toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last settings the graph was sent
    pub fn snapshot(&self) -> &EqualizerSettings {
        &self.snapshot
    }

    pub fn params(&self) -> GraphParams {
        GraphParams {
            bass_gain_db: self.bass.gain_db(),
            mid_gain_db: self.mid.gain_db(),
            treble_gain_db: self.treble.gain_db(),
            bass_freq: self.bass.frequency(),
            mid_freq: self.mid.frequency(),
            treble_freq: self.treble.frequency(),
            mid_q: self.mid.q(),
            preamp_gain: self.preamp.gain(),
            master_gain: self.master.gain(),
            enabled: self.enabled,
            suspended: self.suspended,
            sources: self.sources.len(),
        }
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Tap a media element into the chain input
    ///
    /// Fails when the element is already tapped (by this or another graph)
    /// or the host forbids tapping it. On success the element carries the
    /// attachment marker.
    pub fn connect_source(&mut self, doc: &mut Document, node: NodeId) -> Result<()> {
        doc.tap_media(node, self.instance)?;
        doc.mark_attached(node)?;
        self.sources.push(node);
        debug!(instance = %self.instance, %node, "Media source connected");
        Ok(())
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Resume a suspended context (needs a user gesture on real pages)
    pub fn resume(&mut self) {
        if self.suspended {
            self.suspended = false;
            info!(instance = %self.instance, "Audio context resumed");
        }
    }

    /// Run one block of mixed source audio through the chain in place
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.suspended {
            buffer.silence();
            return;
        }
        self.bass.process(buffer);
        self.mid.process(buffer);
        self.treble.process(buffer);
        self.preamp.process(buffer);
        self.master.process(buffer);
        self.analyser.capture(buffer);
    }

    /// Byte-scaled spectrum of the recent output
    pub fn frequency_data(&mut self) -> Vec<u8> {
        self.analyser.byte_frequency_data()
    }
}
