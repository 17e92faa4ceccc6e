//! Frequency knobs
//!
//! Three knobs on a 0-100 % logarithmic axis (20 Hz - 20 kHz), one per band,
//! kept in order with a minimum gap. Dragging a knob into a neighbour pushes
//! the neighbour (and the next one) along in the drag direction.

use serde::Serialize;

use crate::math::{clamp, freq_to_percent, percent_to_freq, MAX_FREQ_HZ, MIN_FREQ_HZ};
use crate::settings::{Band, EqualizerSettings};

/// A knob that moved during a drag
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KnobMove {
    pub band: Band,
    pub percent: f64,
    /// Whole Hz
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyKnobs {
    positions: [f64; 3],
    gap: f64,
}

impl FrequencyKnobs {
    /// Knobs at the given band frequencies
    ///
    /// Positions that violate the gap are pushed apart, right to left.
    pub fn new(frequencies: [f64; 3], gap_percent: f64) -> Self {
        let mut knobs = Self {
            positions: frequencies.map(freq_to_percent),
            gap: gap_percent,
        };
        knobs.enforce_gaps(0);
        knobs
    }

    pub fn from_settings(settings: &EqualizerSettings, gap_percent: f64) -> Self {
        Self::new(Band::ALL.map(|band| settings.freq(band)), gap_percent)
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn position(&self, band: Band) -> f64 {
        self.positions[band.index()]
    }

    pub fn frequency(&self, band: Band) -> f64 {
        clamp(percent_to_freq(self.position(band)), MIN_FREQ_HZ, MAX_FREQ_HZ)
    }

    pub fn frequencies(&self) -> [f64; 3] {
        Band::ALL.map(|band| self.frequency(band))
    }

    /// Lowest and highest position the knob at `index` can take
    fn limits(&self, index: usize) -> (f64, f64) {
        (
            self.gap * index as f64,
            100.0 - self.gap * (2 - index) as f64,
        )
    }

    /// Clamp every knob into its limits, then push neighbours apart away
    /// from `anchor`
    fn enforce_gaps(&mut self, anchor: usize) {
        for index in 0..3 {
            let (lo, hi) = self.limits(index);
            self.positions[index] = clamp(self.positions[index], lo, hi);
        }
        for index in anchor + 1..3 {
            let min = self.positions[index - 1] + self.gap;
            self.positions[index] = self.positions[index].max(min);
        }
        for index in (0..anchor).rev() {
            let max = self.positions[index + 1] - self.gap;
            self.positions[index] = self.positions[index].min(max);
        }
    }

    /// Drag `band`'s knob to `percent`
    ///
    /// Returns every knob whose position changed, dragged knob first.
    pub fn drag(&mut self, band: Band, percent: f64) -> Vec<KnobMove> {
        let index = band.index();
        let before = self.positions;
        let (lo, hi) = self.limits(index);
        self.positions[index] = clamp(percent, lo, hi);
        self.enforce_gaps(index);

        let mut order = vec![index];
        order.extend((0..3).filter(|&i| i != index));
        order
            .into_iter()
            .filter(|&i| self.positions[i] != before[i])
            .filter_map(Band::from_index)
            .map(|band| KnobMove {
                band,
                percent: self.position(band),
                frequency: self.frequency(band),
            })
            .collect()
    }
}

impl Default for FrequencyKnobs {
    fn default() -> Self {
        Self::from_settings(&EqualizerSettings::default(), 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(knobs: &FrequencyKnobs) {
        let [bass, mid, treble] = Band::ALL.map(|b| knobs.position(b));
        assert!(mid - bass >= knobs.gap() - 1e-9, "bass={} mid={}", bass, mid);
        assert!(treble - mid >= knobs.gap() - 1e-9, "mid={} treble={}", mid, treble);
        let [fb, fm, ft] = knobs.frequencies();
        assert!(fb < fm && fm < ft);
    }

    #[test]
    fn test_default_positions() {
        let knobs = FrequencyKnobs::default();
        assert_eq!(knobs.frequencies(), [60.0, 1000.0, 12000.0]);
    }

    #[test]
    fn test_free_drag_moves_one_knob() {
        let mut knobs = FrequencyKnobs::default();
        let moves = knobs.drag(Band::Mid, 50.0);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].band, Band::Mid);
        assert_eq!(moves[0].frequency, 632.0);
    }

    #[test]
    fn test_drag_pushes_neighbours() {
        let mut knobs = FrequencyKnobs::default();
        let moves = knobs.drag(Band::Bass, 97.0);
        // Bass stops at 90 %, mid at 95 %, treble at 100 %
        assert_eq!(
            moves.iter().map(|m| m.band).collect::<Vec<_>>(),
            vec![Band::Bass, Band::Mid, Band::Treble]
        );
        assert_eq!(knobs.position(Band::Bass), 90.0);
        assert_eq!(knobs.position(Band::Treble), 100.0);
        assert_eq!(knobs.frequency(Band::Treble), 20000.0);
        assert_ordered(&knobs);
    }

    #[test]
    fn test_drag_left_pushes_lower_bands() {
        let mut knobs = FrequencyKnobs::default();
        knobs.drag(Band::Treble, -20.0);
        assert_eq!(knobs.position(Band::Bass), 0.0);
        assert_eq!(knobs.position(Band::Mid), 5.0);
        assert_eq!(knobs.position(Band::Treble), 10.0);
        assert_ordered(&knobs);
    }

    #[test]
    fn test_ordering_holds_for_any_drag() {
        let mut knobs = FrequencyKnobs::default();
        let script = [
            (Band::Mid, 3.0),
            (Band::Treble, 40.0),
            (Band::Bass, 60.0),
            (Band::Mid, 100.0),
            (Band::Bass, -5.0),
            (Band::Treble, 12.0),
        ];
        for (band, percent) in script {
            knobs.drag(band, percent);
            assert_ordered(&knobs);
        }
    }

    #[test]
    fn test_crowded_settings_are_spread() {
        let knobs = FrequencyKnobs::new([1000.0, 1010.0, 1020.0], 5.0);
        assert_ordered(&knobs);
    }
}
