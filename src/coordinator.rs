//! Coordinator
//!
//! Long-lived service that owns tab lifecycle: it reacts to toggle messages
//! from the control surface, re-injects and rehydrates pages after
//! navigation, forgets closed tabs and derives the badge text. The per-tab
//! enabled cache is rebuilt lazily from `eqEnabled_T`, so a restarted
//! coordinator picks up where the old one left off.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::bus::{is_instrumentable, ControlMessage, TabHost, TabId};
use crate::channel::ParameterChannel;
use crate::error::Result;
use crate::store::SettingsStore;

/// Load status reported for a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    /// A new page started loading; the old page and its graph are gone
    Loading,
    /// The page finished loading
    Complete,
}

/// Inject the page script unless this page load already has it
///
/// Returns true when an injection happened. A rejected injection clears the
/// guard again so a later attempt can retry.
pub async fn ensure_injected(host: &TabHost, store: &SettingsStore, tab: TabId) -> Result<bool> {
    if !store.claim_injection(tab).await? {
        debug!(%tab, "Script already injected");
        return Ok(false);
    }
    if let Err(err) = host.inject_equalizer(tab) {
        store.clear_has_run(tab).await;
        return Err(err);
    }
    Ok(true)
}

#[derive(Clone)]
pub struct Coordinator {
    host: TabHost,
    store: SettingsStore,
    enabled: Arc<Mutex<HashMap<TabId, bool>>>,
}

impl Coordinator {
    pub fn new(host: TabHost, store: SettingsStore) -> Self {
        Self {
            host,
            store,
            enabled: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn host(&self) -> &TabHost {
        &self.host
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<TabId, bool>> {
        self.enabled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached toggle state, loaded from the store on first use
    pub async fn is_enabled(&self, tab: TabId) -> bool {
        if let Some(&enabled) = self.cache().get(&tab) {
            return enabled;
        }
        let enabled = self.store.load_toggle(tab).await;
        self.cache().insert(tab, enabled);
        enabled
    }

    /// Badge label for the tab: "on" or "off"
    pub fn badge_text(&self, tab: TabId) -> &'static str {
        match self.cache().get(&tab) {
            Some(true) => "on",
            _ => "off",
        }
    }

    pub async fn on_message(&self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::ToggleChanged { tab_id, enabled } => {
                info!(tab = %tab_id, enabled, "Toggle changed");
                self.cache().insert(tab_id, enabled);
                self.store.save_toggle(tab_id, enabled).await;
                if enabled {
                    self.inject_and_apply(tab_id).await
                } else {
                    ParameterChannel::new(tab_id, self.host.clone(), self.store.clone())
                        .broadcast_disable();
                    Ok(())
                }
            }
        }
    }

    /// Make sure the page has a graph, enable it and push the stored snapshot
    async fn inject_and_apply(&self, tab: TabId) -> Result<()> {
        let url = self.host.url(tab)?;
        if !is_instrumentable(&url) {
            info!(%tab, url = %url, "Skipping equalizer on non-http page");
            return Ok(());
        }
        if let Err(err) = ensure_injected(&self.host, &self.store, tab).await {
            warn!(%tab, error = %err, "Injection failed");
            return Ok(());
        }

        let channel = ParameterChannel::new(tab, self.host.clone(), self.store.clone());
        channel.broadcast_enable();
        let state = self.store.load_settings(tab).await;
        channel.send_full(&state.eq).await
    }

    /// React to a tab load event
    ///
    /// A new page resets the injection guard; once it completes, an enabled
    /// tab gets the script and its stored settings again.
    pub async fn on_tab_updated(&self, tab: TabId, status: TabStatus) -> Result<()> {
        match status {
            TabStatus::Loading => {
                self.store.clear_has_run(tab).await;
                Ok(())
            }
            TabStatus::Complete => {
                if self.is_enabled(tab).await {
                    debug!(%tab, "Rehydrating equalizer after load");
                    self.inject_and_apply(tab).await
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Load `url` into the tab and run the full reload sequence
    pub async fn navigate(&self, tab: TabId, url: &str) -> Result<()> {
        self.host.navigate(tab, url)?;
        self.on_tab_updated(tab, TabStatus::Loading).await?;
        self.on_tab_updated(tab, TabStatus::Complete).await
    }

    /// Forget everything about a closed tab
    pub async fn on_tab_removed(&self, tab: TabId) {
        self.cache().remove(&tab);
        self.store.clear_tab(tab).await;
    }

    /// Close the tab in the host, then forget it
    pub async fn close_tab(&self, tab: TabId) -> Result<()> {
        self.host.close_tab(tab)?;
        self.on_tab_removed(tab).await;
        Ok(())
    }
}
