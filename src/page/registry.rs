//! Graph instance registry
//!
//! Explicit replacement for a page-global "already injected" flag: each page
//! load gets a `PageId`, and the registry hands out at most one graph
//! `InstanceId` per page. Re-entrant installs on the same page observe the
//! existing claim and do nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Identity of one page load (a navigation creates a new one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one audio graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    instance: InstanceId,
    registered_at: DateTime<Utc>,
}

/// Page -> graph instance map shared by all page contexts
#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    entries: Arc<Mutex<HashMap<PageId, Registration>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PageId, Registration>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the page's single graph slot
    ///
    /// Returns a fresh instance id for the first caller and `None` for every
    /// later one until the page is released.
    pub fn claim(&self, page: PageId) -> Option<InstanceId> {
        let mut entries = self.lock();
        if let Some(existing) = entries.get(&page) {
            debug!(%page, instance = %existing.instance, "Graph already registered");
            return None;
        }
        let instance = InstanceId::new();
        entries.insert(
            page,
            Registration {
                instance,
                registered_at: Utc::now(),
            },
        );
        Some(instance)
    }

    pub fn instance(&self, page: PageId) -> Option<InstanceId> {
        self.lock().get(&page).map(|r| r.instance)
    }

    pub fn registered_at(&self, page: PageId) -> Option<DateTime<Utc>> {
        self.lock().get(&page).map(|r| r.registered_at)
    }

    /// Forget the page (called when its context is torn down)
    pub fn release(&self, page: PageId) -> Option<InstanceId> {
        self.lock().remove(&page).map(|r| r.instance)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_claim_per_page() {
        let registry = GraphRegistry::new();
        let page = PageId::new();

        let first = registry.claim(page);
        assert!(first.is_some());
        assert!(registry.claim(page).is_none());
        assert_eq!(registry.instance(page), first);
        assert!(registry.registered_at(page).is_some());

        let other = PageId::new();
        assert!(registry.claim(other).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_allows_reclaim() {
        let registry = GraphRegistry::new();
        let page = PageId::new();
        let first = registry.claim(page).unwrap();
        assert_eq!(registry.release(page), Some(first));
        let second = registry.claim(page).unwrap();
        assert_ne!(first, second);
    }
}
