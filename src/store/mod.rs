//! Session-scoped persistence
//!
//! `SessionStorage` is the raw key-value area; `SettingsStore` layers the
//! per-tab key namespace and merge semantics on top. The store, not the live
//! graph, is the system of record for a tab's settings.

mod session;
mod settings;

pub use session::SessionStorage;
pub use settings::{keys, SettingsStore, TabState};
