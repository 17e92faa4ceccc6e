//! Cross-context message bus
//!
//! The page context and the control-surface context share no memory. They
//! talk through typed messages: fire-and-forget `PageEvent`s for parameter
//! pushes and `PageRequest`/`PageResponse` pairs for pulls such as spectrum
//! data. `TabHost` owns the tabs, spawns one page context per loaded page
//! and routes messages to it.

mod host;
mod messages;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use host::{is_instrumentable, TabHost};
pub use messages::{ControlMessage, PageEnvelope, PageEvent, PageRequest, PageResponse};

/// Browser tab identity, the scoping key for persisted settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
