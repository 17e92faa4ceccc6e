//! Parameter Channel
//!
//! Moves settings from the control surface into the page's audio graph.
//! Sends are fire-and-forget: a page that has gone away (navigation, tab
//! close) makes the send a logged no-op. Writes to the settings store are
//! awaited, so a send that returns `Ok` is durable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::bus::{PageEvent, TabHost, TabId};
use crate::error::Result;
use crate::settings::{EqField, EqUpdate, EqualizerSettings};
use crate::store::SettingsStore;

/// Message counters of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// Whole-snapshot updates sent
    pub full: usize,
    /// Single-field updates sent
    pub field: usize,
    /// Enable/disable broadcasts sent
    pub toggles: usize,
    /// Sends that found no live page
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    full: AtomicUsize,
    field: AtomicUsize,
    toggles: AtomicUsize,
    dropped: AtomicUsize,
}

/// Sender side of the control-surface -> page protocol for one tab
#[derive(Clone)]
pub struct ParameterChannel {
    tab: TabId,
    host: TabHost,
    store: SettingsStore,
    counters: Arc<Counters>,
}

impl ParameterChannel {
    pub fn new(tab: TabId, host: TabHost, store: SettingsStore) -> Self {
        Self {
            tab,
            host,
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            full: self.counters.full.load(Ordering::Relaxed),
            field: self.counters.field.load(Ordering::Relaxed),
            toggles: self.counters.toggles.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Deliver an event, treating a missing page as a no-op
    fn deliver(&self, event: PageEvent) {
        if let Err(err) = self.host.dispatch(self.tab, event) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            if err.is_transport() {
                debug!(tab = %self.tab, error = %err, "Page gone, update dropped");
            } else {
                warn!(tab = %self.tab, error = %err, "Update not delivered");
            }
        }
    }

    /// Persist the full snapshot, then apply it in the page
    pub async fn send_full(&self, settings: &EqualizerSettings) -> Result<()> {
        self.store.save_settings(self.tab, settings, None).await?;
        self.counters.full.fetch_add(1, Ordering::Relaxed);
        self.deliver(PageEvent::UpdateEqualizer(settings.to_update()));
        Ok(())
    }

    /// Apply one field in the page, then merge it into the store
    ///
    /// The page sees the update before the store write completes; the store
    /// write is still awaited before returning.
    pub async fn send_field(&self, field: EqField, value: f64) -> Result<()> {
        let value = field.normalize(value)?;
        self.counters.field.fetch_add(1, Ordering::Relaxed);
        self.deliver(PageEvent::UpdateEqualizer(EqUpdate::single(field, value)));
        self.store.save_field(self.tab, field, value).await
    }

    /// Force the page's graph to neutral
    pub fn broadcast_disable(&self) {
        self.counters.toggles.fetch_add(1, Ordering::Relaxed);
        self.deliver(PageEvent::DisableEqualizer);
    }

    /// Reapply the page graph's retained snapshot
    pub fn broadcast_enable(&self) {
        self.counters.toggles.fetch_add(1, Ordering::Relaxed);
        self.deliver(PageEvent::EnableEqualizer);
    }
}
