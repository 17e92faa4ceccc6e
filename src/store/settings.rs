//! Settings Store
//!
//! Per-tab namespaced view over session storage. Keys for tab `T`:
//!
//! | key                  | value                                  |
//! |----------------------|----------------------------------------|
//! | `eq_T`               | tone snapshot `{bass, mid, treble, preamp, master}` |
//! | `eqEnabled_T`        | bool                                   |
//! | `activePreset_T`     | preset name, `"custom"`, `"reset"` or null |
//! | `freq_<band>_T`      | Hz                                     |
//! | `midQ_T`             | number                                 |
//! | `hasRun_T`           | bool, script already injected          |
//! | `configOption_T`     | `"gain"`, `"frequency"` or `"quality"` |
//!
//! Reads never fail: absent or unreadable values fall back to defaults.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::SessionStorage;
use crate::bus::TabId;
use crate::error::Result;
use crate::settings::{ActivePreset, Band, ConfigPanel, EqField, EqualizerSettings, ToneSettings};

/// Storage key builders
pub mod keys {
    use crate::bus::TabId;
    use crate::settings::Band;

    pub fn eq(tab: TabId) -> String {
        format!("eq_{}", tab)
    }

    pub fn enabled(tab: TabId) -> String {
        format!("eqEnabled_{}", tab)
    }

    pub fn active_preset(tab: TabId) -> String {
        format!("activePreset_{}", tab)
    }

    pub fn band_freq(band: Band, tab: TabId) -> String {
        format!("freq_{}_{}", band.key(), tab)
    }

    pub fn mid_q(tab: TabId) -> String {
        format!("midQ_{}", tab)
    }

    pub fn has_run(tab: TabId) -> String {
        format!("hasRun_{}", tab)
    }

    pub fn config_option(tab: TabId) -> String {
        format!("configOption_{}", tab)
    }

    /// Every key owned by the tab
    pub fn all(tab: TabId) -> Vec<String> {
        let mut keys = vec![
            eq(tab),
            enabled(tab),
            active_preset(tab),
            mid_q(tab),
            has_run(tab),
            config_option(tab),
        ];
        keys.extend(Band::ALL.iter().map(|&band| band_freq(band, tab)));
        keys
    }
}

/// Everything the control surface needs to render a tab
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabState {
    pub eq: EqualizerSettings,
    pub enabled: bool,
    pub active_preset: Option<ActivePreset>,
}

/// Per-tab settings persistence
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    storage: SessionStorage,
}

impl SettingsStore {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.storage.get(key).await?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(key, error = %err, "Unreadable stored value, using default");
                None
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load settings, toggle and preset marker, defaulting whatever is absent
    pub async fn load_settings(&self, tab: TabId) -> TabState {
        let tone: ToneSettings = self.read(&keys::eq(tab)).await.unwrap_or_default();

        let mut eq = EqualizerSettings::default();
        for field in EqField::ALL.into_iter().filter(EqField::is_tone) {
            eq.set(field, tone.get(field));
        }
        for band in Band::ALL {
            if let Some(freq) = self.read::<f64>(&keys::band_freq(band, tab)).await {
                eq.set(band.freq_field(), freq);
            }
        }
        if let Some(q) = self.read::<f64>(&keys::mid_q(tab)).await {
            eq.mid_q = q;
        }

        TabState {
            eq: eq.sanitized(),
            enabled: self.load_toggle(tab).await,
            active_preset: self.load_active_preset(tab).await,
        }
    }

    pub async fn load_toggle(&self, tab: TabId) -> bool {
        self.read(&keys::enabled(tab)).await.unwrap_or(false)
    }

    pub async fn load_active_preset(&self, tab: TabId) -> Option<ActivePreset> {
        self.read(&keys::active_preset(tab)).await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Merge one field into the stored settings
    ///
    /// Tone fields are merged into `eq_T` with a read-modify-write, so
    /// concurrent writers of other fields are never clobbered. Frequencies
    /// and Q go to their own keys.
    pub async fn save_field(&self, tab: TabId, field: EqField, value: f64) -> Result<()> {
        let value = field.normalize(value)?;
        if let Some(band) = field.freq_band() {
            return self.save_band_frequency(tab, band, value).await;
        }
        if field == EqField::MidQ {
            return self.save_mid_q(tab, value).await;
        }

        self.storage
            .update(&keys::eq(tab), |current| {
                let mut tone: ToneSettings = current
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                tone.set(field, value);
                Ok(serde_json::to_value(tone)?)
            })
            .await?;
        debug!(%tab, %field, value, "Field saved");
        Ok(())
    }

    /// Write the whole snapshot, and the preset marker when given
    pub async fn save_settings(
        &self,
        tab: TabId,
        settings: &EqualizerSettings,
        preset: Option<ActivePreset>,
    ) -> Result<()> {
        let mut values = vec![
            (keys::eq(tab), serde_json::to_value(settings.tone())?),
            (keys::mid_q(tab), Value::from(settings.mid_q)),
        ];
        for band in Band::ALL {
            values.push((keys::band_freq(band, tab), Value::from(settings.freq(band))));
        }
        if let Some(preset) = preset {
            values.push((keys::active_preset(tab), serde_json::to_value(preset)?));
        }
        self.storage.set_many(values).await;
        debug!(%tab, "Settings saved");
        Ok(())
    }

    pub async fn save_toggle(&self, tab: TabId, enabled: bool) {
        self.storage.set(&keys::enabled(tab), Value::Bool(enabled)).await;
    }

    /// Store the marker; `None` stores null
    pub async fn save_active_preset(&self, tab: TabId, preset: Option<ActivePreset>) {
        let value = preset.map(|p| Value::String(p.to_string())).unwrap_or(Value::Null);
        self.storage.set(&keys::active_preset(tab), value).await;
    }

    pub async fn save_band_frequency(&self, tab: TabId, band: Band, hz: f64) -> Result<()> {
        let hz = band.freq_field().normalize(hz)?;
        self.storage
            .set(&keys::band_freq(band, tab), Value::from(hz))
            .await;
        Ok(())
    }

    pub async fn save_mid_q(&self, tab: TabId, q: f64) -> Result<()> {
        let q = EqField::MidQ.normalize(q)?;
        self.storage.set(&keys::mid_q(tab), Value::from(q)).await;
        Ok(())
    }

    // ========================================================================
    // Injection Guard and Panel
    // ========================================================================

    pub async fn has_run(&self, tab: TabId) -> bool {
        self.read(&keys::has_run(tab)).await.unwrap_or(false)
    }

    pub async fn mark_has_run(&self, tab: TabId) {
        self.storage.set(&keys::has_run(tab), Value::Bool(true)).await;
    }

    /// Atomically set `hasRun_T`; true when this call flipped it
    pub async fn claim_injection(&self, tab: TabId) -> Result<bool> {
        let mut claimed = false;
        self.storage
            .update(&keys::has_run(tab), |current| {
                claimed = current != Some(&Value::Bool(true));
                Ok(Value::Bool(true))
            })
            .await?;
        Ok(claimed)
    }

    /// The tab started loading a new page; the next open must inject again
    pub async fn clear_has_run(&self, tab: TabId) {
        self.storage.remove(&[keys::has_run(tab)]).await;
    }

    pub async fn save_config_panel(&self, tab: TabId, panel: ConfigPanel) -> Result<()> {
        self.storage
            .set(&keys::config_option(tab), serde_json::to_value(panel)?)
            .await;
        Ok(())
    }

    pub async fn load_config_panel(&self, tab: TabId) -> ConfigPanel {
        self.read(&keys::config_option(tab)).await.unwrap_or_default()
    }

    /// Forget everything about the tab
    pub async fn clear_tab(&self, tab: TabId) {
        self.storage.remove(&keys::all(tab)).await;
        debug!(%tab, "Tab settings cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PresetName;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_tab_loads_defaults() {
        let store = SettingsStore::default();
        let state = store.load_settings(TabId(9)).await;
        assert_eq!(
            state,
            TabState {
                eq: EqualizerSettings::default(),
                enabled: false,
                active_preset: None,
            }
        );
        assert_eq!(store.load_config_panel(TabId(9)).await, ConfigPanel::Gain);
    }

    #[tokio::test]
    async fn test_save_field_merges() {
        let store = SettingsStore::default();
        let tab = TabId(1);
        store.save_field(tab, EqField::Bass, 7.0).await.unwrap();
        store.save_field(tab, EqField::Master, 140.0).await.unwrap();
        store.save_field(tab, EqField::TrebleFreq, 9000.0).await.unwrap();

        let eq = store.load_settings(tab).await.eq;
        assert_eq!(
            eq,
            EqualizerSettings {
                bass: 7.0,
                master: 140.0,
                treble_freq: 9000.0,
                ..Default::default()
            }
        );
        assert_eq!(
            store.storage().get("eq_1").await,
            Some(json!({"bass": 7.0, "mid": 0.0, "treble": 0.0, "preamp": 0.0, "master": 140.0}))
        );
        assert_eq!(store.storage().get("freq_treble_1").await, Some(json!(9000.0)));
    }

    #[tokio::test]
    async fn test_tabs_are_isolated() {
        let store = SettingsStore::default();
        store.save_field(TabId(1), EqField::Mid, -5.0).await.unwrap();
        store.save_toggle(TabId(1), true).await;

        let other = store.load_settings(TabId(2)).await;
        assert_eq!(other.eq.mid, 0.0);
        assert!(!other.enabled);
    }

    #[tokio::test]
    async fn test_preset_marker_round_trip() {
        let store = SettingsStore::default();
        let tab = TabId(3);
        store
            .save_active_preset(tab, Some(ActivePreset::Preset(PresetName::BoostPop)))
            .await;
        assert_eq!(
            store.storage().get("activePreset_3").await,
            Some(json!("boostPop"))
        );
        assert_eq!(
            store.load_active_preset(tab).await,
            Some(ActivePreset::Preset(PresetName::BoostPop))
        );

        store.save_active_preset(tab, None).await;
        assert_eq!(store.storage().get("activePreset_3").await, Some(Value::Null));
        assert_eq!(store.load_active_preset(tab).await, None);
    }

    #[tokio::test]
    async fn test_garbage_values_fall_back() {
        let store = SettingsStore::default();
        let tab = TabId(4);
        store.storage().set("eq_4", json!("not an object")).await;
        store.storage().set("activePreset_4", json!("loudness")).await;
        store.storage().set("freq_mid_4", json!(10.0)).await;

        let state = store.load_settings(tab).await;
        assert_eq!(state.eq, EqualizerSettings::default());
        assert_eq!(state.active_preset, None);
    }

    #[tokio::test]
    async fn test_clear_tab_removes_every_key() {
        let store = SettingsStore::default();
        let tab = TabId(5);
        store.save_settings(tab, &EqualizerSettings::default(), Some(ActivePreset::Reset))
            .await
            .unwrap();
        store.save_toggle(tab, true).await;
        store.mark_has_run(tab).await;
        store.save_config_panel(tab, ConfigPanel::Quality).await.unwrap();
        store.save_toggle(TabId(6), true).await;

        store.clear_tab(tab).await;
        assert_eq!(store.storage().keys().await, vec!["eqEnabled_6"]);
    }
}
