//! Control Surface
//!
//! Headless model of the equalizer panel for one tab. It reads the settings
//! store on open, pushes every interaction through the parameter channel
//! and keeps the preset marker honest:
//!
//! - a trusted (user) slider input marks the tab `"custom"`
//! - animated moves from presets and resets are untrusted and never do
//!
//! Controls are inert while the toggle is off or the page cannot be
//! instrumented.

use tracing::{debug, info, warn};

use super::{slider_steps, BandCurve, FrequencyKnobs, KnobMove, PlotPoint, ResponseCurves, SpectrumSampler};
use crate::bus::{is_instrumentable, ControlMessage, TabHost, TabId};
use crate::channel::ParameterChannel;
use crate::config::EqConfig;
use crate::coordinator::{ensure_injected, Coordinator};
use crate::error::Result;
use crate::settings::{ActivePreset, Band, ConfigPanel, EqField, EqualizerSettings, PresetName};
use crate::store::SettingsStore;

pub struct ControlSurface {
    tab: TabId,
    config: EqConfig,
    store: SettingsStore,
    channel: ParameterChannel,
    coordinator: Coordinator,
    settings: EqualizerSettings,
    enabled: bool,
    active_preset: Option<ActivePreset>,
    panel: ConfigPanel,
    instrumentable: bool,
    knobs: FrequencyKnobs,
    curves: ResponseCurves,
    sampler: SpectrumSampler,
}

impl ControlSurface {
    /// Open the panel on `tab`
    ///
    /// Injects the page script once per page load (guarded by `hasRun_T`),
    /// loads the stored state and, when the toggle is on, re-sends the full
    /// snapshot so the page matches the store.
    pub async fn open(
        host: TabHost,
        store: SettingsStore,
        coordinator: Coordinator,
        tab: TabId,
    ) -> Result<Self> {
        let config = host.config().clone();
        let url = host.url(tab)?;
        let instrumentable = is_instrumentable(&url);

        if instrumentable {
            if let Err(err) = ensure_injected(&host, &store, tab).await {
                warn!(%tab, error = %err, "Failed to inject content script");
            }
        } else {
            info!(%tab, url = %url, "Equalizer cannot be applied on this page");
        }

        let state = store.load_settings(tab).await;
        let panel = store.load_config_panel(tab).await;
        let channel = ParameterChannel::new(tab, host.clone(), store.clone());
        if instrumentable && state.enabled {
            channel.send_full(&state.eq).await?;
        }

        let sampler = SpectrumSampler::start(
            host,
            instrumentable.then_some(tab),
            config.spectrum_poll_interval(),
        );

        Ok(Self {
            tab,
            knobs: FrequencyKnobs::from_settings(&state.eq, config.knob_gap_percent),
            curves: ResponseCurves::new(&config),
            config,
            store,
            channel,
            coordinator,
            settings: state.eq,
            enabled: state.enabled,
            active_preset: state.active_preset,
            panel,
            instrumentable,
            sampler,
        })
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn settings(&self) -> &EqualizerSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_instrumentable(&self) -> bool {
        self.instrumentable
    }

    /// Sliders, presets and knobs respond only when this is true
    pub fn controls_enabled(&self) -> bool {
        self.enabled && self.instrumentable
    }

    pub fn active_preset(&self) -> Option<ActivePreset> {
        self.active_preset
    }

    pub fn panel(&self) -> ConfigPanel {
        self.panel
    }

    pub fn knobs(&self) -> &FrequencyKnobs {
        &self.knobs
    }

    pub fn channel(&self) -> &ParameterChannel {
        &self.channel
    }

    fn inert(&self, action: &str) -> bool {
        if !self.controls_enabled() {
            debug!(tab = %self.tab, action, "Controls disabled, input ignored");
            return true;
        }
        false
    }

    async fn set_marker(&mut self, marker: ActivePreset) {
        self.active_preset = Some(marker);
        self.store.save_active_preset(self.tab, Some(marker)).await;
    }

    // ========================================================================
    // Sliders
    // ========================================================================

    /// Band gain slider input
    ///
    /// `trusted` is true for real user input; such input turns the preset
    /// marker into `"custom"`.
    pub async fn set_gain(&mut self, band: Band, value: f64, trusted: bool) -> Result<()> {
        if self.inert("gain") {
            return Ok(());
        }
        self.apply_field(band.gain_field(), value).await?;
        if trusted && self.active_preset != Some(ActivePreset::Custom) {
            self.set_marker(ActivePreset::Custom).await;
        }
        Ok(())
    }

    pub async fn set_preamp(&mut self, db: f64) -> Result<()> {
        if self.inert("preamp") {
            return Ok(());
        }
        self.apply_field(EqField::Preamp, db).await
    }

    pub async fn set_master(&mut self, percent: f64) -> Result<()> {
        if self.inert("master") {
            return Ok(());
        }
        self.apply_field(EqField::Master, percent).await
    }

    pub async fn set_mid_q(&mut self, q: f64) -> Result<()> {
        if self.inert("quality") {
            return Ok(());
        }
        self.apply_field(EqField::MidQ, q).await
    }

    async fn apply_field(&mut self, field: EqField, value: f64) -> Result<()> {
        let value = field.normalize(value)?;
        self.settings.set(field, value);
        self.channel.send_field(field, value).await
    }

    /// Drag a band slider to `target` in `ticks` trusted steps
    pub async fn drag_gain(&mut self, band: Band, target: f64, ticks: usize) -> Result<()> {
        let start = self.settings.gain(band);
        let ticks = ticks.max(1);
        for tick in 1..=ticks {
            let value = if tick == ticks {
                target
            } else {
                start + (target - start) * tick as f64 / ticks as f64
            };
            self.set_gain(band, value, true).await?;
        }
        Ok(())
    }

    /// Move all three band sliders to `targets` with eased, untrusted ticks
    async fn animate_bands(&mut self, targets: [f64; 3]) -> Result<()> {
        let steps = self.config.animation_steps;
        let paths: Vec<Vec<f64>> = Band::ALL
            .iter()
            .zip(targets)
            .map(|(&band, target)| slider_steps(self.settings.gain(band), target, steps))
            .collect();

        let frame = self.config.animation_frame();
        for tick in 0..steps.max(1) {
            for (band, path) in Band::ALL.iter().zip(&paths) {
                if let Some(&value) = path.get(tick) {
                    self.set_gain(*band, value, false).await?;
                }
            }
            if !frame.is_zero() {
                tokio::time::sleep(frame).await;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Presets and Resets
    // ========================================================================

    /// Animate the bands to a preset; preamp, master and frequencies stay
    pub async fn apply_preset(&mut self, name: PresetName) -> Result<()> {
        if self.inert("preset") {
            return Ok(());
        }
        let preset = name.definition();
        self.animate_bands(Band::ALL.map(|band| preset.gain(band)))
            .await?;
        self.set_marker(ActivePreset::Preset(name)).await;
        info!(tab = %self.tab, preset = %name, "Preset applied");
        Ok(())
    }

    /// Reset one band to 0 dB (context-menu reset)
    pub async fn reset_band(&mut self, band: Band) -> Result<()> {
        if self.inert("reset band") {
            return Ok(());
        }
        self.set_gain(band, 0.0, false).await?;
        let marker = if self.settings.tone().is_flat() {
            ActivePreset::Reset
        } else {
            ActivePreset::Custom
        };
        self.set_marker(marker).await;
        Ok(())
    }

    /// Animate every band back to 0 dB
    pub async fn reset_all(&mut self) -> Result<()> {
        if self.inert("reset") {
            return Ok(());
        }
        self.animate_bands([0.0; 3]).await?;
        self.set_marker(ActivePreset::Reset).await;
        Ok(())
    }

    // ========================================================================
    // Frequency Knobs
    // ========================================================================

    /// Drag a frequency knob; pushed neighbours are sent and persisted too
    pub async fn drag_knob(&mut self, band: Band, percent: f64) -> Result<Vec<KnobMove>> {
        if self.inert("knob") {
            return Ok(Vec::new());
        }
        let moves = self.knobs.drag(band, percent);
        for knob in &moves {
            self.apply_field(knob.band.freq_field(), knob.frequency)
                .await?;
        }
        Ok(moves)
    }

    // ========================================================================
    // Toggle, Panel, Visuals
    // ========================================================================

    /// Flip the equalizer for this tab via the coordinator
    pub async fn toggle(&mut self, enabled: bool) -> Result<()> {
        self.enabled = enabled;
        self.coordinator
            .on_message(ControlMessage::ToggleChanged {
                tab_id: self.tab,
                enabled,
            })
            .await
    }

    pub async fn select_panel(&mut self, panel: ConfigPanel) -> Result<()> {
        self.panel = panel;
        self.store.save_config_panel(self.tab, panel).await
    }

    /// The three independent band curves for a `width x height` plot
    pub fn response_curves(&self, width: f64, height: f64) -> Vec<BandCurve> {
        self.curves.curves(&self.settings, width, height)
    }

    pub fn composite_curve(&self, width: f64, height: f64) -> Vec<PlotPoint> {
        self.curves.composite_curve(&self.settings, width, height)
    }

    /// Latest spectrum frame
    pub fn spectrum(&self) -> Vec<u8> {
        self.sampler.latest()
    }

    pub async fn next_spectrum(&mut self) -> Option<Vec<u8>> {
        self.sampler.next_frame().await
    }

    /// Panel hidden: stop polling until shown again
    pub fn hide(&self) {
        self.sampler.pause();
    }

    pub fn show(&self) {
        self.sampler.resume();
    }

    /// Close the panel, cancelling the spectrum poll
    pub fn close(self) {
        debug!(tab = %self.tab, "Control surface closed");
        self.sampler.stop();
    }
}
