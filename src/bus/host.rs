//! Tab host
//!
//! In-process stand-in for the browser: tracks open tabs, runs one
//! `PageContext` task per loaded page and provides the "inject a script into
//! the target page" capability. Cloning yields another handle to the same
//! host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{PageEnvelope, PageEvent, PageRequest, PageResponse, TabId};
use crate::config::EqConfig;
use crate::error::{EqError, Result};
use crate::page::{Document, GraphRegistry, PageContext, PageId, SharedDocument};

/// Only http(s) pages can be instrumented
pub fn is_instrumentable(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Live page loaded in a tab
struct LoadedPage {
    id: PageId,
    sender: mpsc::UnboundedSender<PageEnvelope>,
    document: SharedDocument,
}

struct TabEntry {
    url: String,
    page: LoadedPage,
    injections: usize,
}

#[derive(Default)]
struct HostInner {
    tabs: HashMap<TabId, TabEntry>,
    next_tab: u32,
}

/// Handle to the set of open tabs
#[derive(Clone)]
pub struct TabHost {
    inner: Arc<Mutex<HostInner>>,
    registry: GraphRegistry,
    config: Arc<EqConfig>,
}

impl TabHost {
    pub fn new(config: EqConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HostInner {
                tabs: HashMap::new(),
                next_tab: 1,
            })),
            registry: GraphRegistry::new(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EqConfig {
        &self.config
    }

    pub fn registry(&self) -> &GraphRegistry {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, HostInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a page context for a fresh document
    ///
    /// The context runs until its queue closes, i.e. until the returned
    /// `LoadedPage` (the only sender) is dropped.
    fn load_page(&self) -> LoadedPage {
        let id = PageId::new();
        let document = Document::shared();
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = PageContext::new(
            id,
            Arc::clone(&document),
            self.registry.clone(),
            Arc::clone(&self.config),
        );
        tokio::spawn(context.run(receiver));
        LoadedPage {
            id,
            sender,
            document,
        }
    }

    /// Open a new tab on `url`
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_tab(&self, url: &str) -> TabId {
        let page = self.load_page();
        let mut inner = self.lock();
        let tab = TabId(inner.next_tab);
        inner.next_tab += 1;
        info!(%tab, url, page = %page.id, "Tab opened");
        inner.tabs.insert(
            tab,
            TabEntry {
                url: url.to_string(),
                page,
                injections: 0,
            },
        );
        tab
    }

    /// Load `url` into the tab, discarding the current page and its graph
    pub fn navigate(&self, tab: TabId, url: &str) -> Result<PageId> {
        let page = self.load_page();
        let id = page.id;
        let mut inner = self.lock();
        let entry = inner.tabs.get_mut(&tab).ok_or(EqError::UnknownTab { tab })?;
        let old = std::mem::replace(&mut entry.page, page);
        entry.url = url.to_string();
        info!(%tab, url, old_page = %old.id, page = %id, "Tab navigated");
        Ok(id)
    }

    /// Close the tab and tear down its page
    pub fn close_tab(&self, tab: TabId) -> Result<()> {
        let removed = self.lock().tabs.remove(&tab);
        match removed {
            Some(entry) => {
                info!(%tab, page = %entry.page.id, "Tab closed");
                Ok(())
            }
            None => Err(EqError::UnknownTab { tab }),
        }
    }

    pub fn url(&self, tab: TabId) -> Result<String> {
        self.lock()
            .tabs
            .get(&tab)
            .map(|entry| entry.url.clone())
            .ok_or(EqError::UnknownTab { tab })
    }

    pub fn page_id(&self, tab: TabId) -> Result<PageId> {
        self.lock()
            .tabs
            .get(&tab)
            .map(|entry| entry.page.id)
            .ok_or(EqError::UnknownTab { tab })
    }

    /// Document of the page currently loaded in the tab
    pub fn document(&self, tab: TabId) -> Result<SharedDocument> {
        self.lock()
            .tabs
            .get(&tab)
            .map(|entry| Arc::clone(&entry.page.document))
            .ok_or(EqError::UnknownTab { tab })
    }

    pub fn tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.lock().tabs.keys().copied().collect();
        tabs.sort();
        tabs
    }

    fn sender(&self, tab: TabId) -> Result<mpsc::UnboundedSender<PageEnvelope>> {
        self.lock()
            .tabs
            .get(&tab)
            .map(|entry| entry.page.sender.clone())
            .ok_or(EqError::UnknownTab { tab })
    }

    /// Fire-and-forget delivery of an in-page signal
    ///
    /// Events for one tab reach the page in send order.
    pub fn dispatch(&self, tab: TabId, event: PageEvent) -> Result<()> {
        debug!(%tab, ?event, "Dispatch");
        self.sender(tab)?
            .send(PageEnvelope::Event(event))
            .map_err(|_| EqError::PageUnavailable { tab })
    }

    /// Send a request to the page and wait for its reply
    pub async fn request(&self, tab: TabId, request: PageRequest) -> Result<PageResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender(tab)?
            .send(PageEnvelope::Request(request, reply_tx))
            .map_err(|_| EqError::PageUnavailable { tab })?;
        reply_rx.await.map_err(|_| EqError::ReplyDropped { tab })
    }

    /// Inject the equalizer script into the tab's page
    ///
    /// Rejects non-http(s) pages. Injecting twice into the same page is
    /// harmless: the page builds at most one graph.
    pub fn inject_equalizer(&self, tab: TabId) -> Result<()> {
        let sender = {
            let mut inner = self.lock();
            let entry = inner.tabs.get_mut(&tab).ok_or(EqError::UnknownTab { tab })?;
            if !is_instrumentable(&entry.url) {
                return Err(EqError::InvalidPage {
                    url: entry.url.clone(),
                });
            }
            entry.injections += 1;
            entry.page.sender.clone()
        };
        info!(%tab, "Injecting equalizer");
        sender
            .send(PageEnvelope::Event(PageEvent::InstallEqualizer))
            .map_err(|_| EqError::PageUnavailable { tab })
    }

    /// Number of script injections performed on the tab since it was opened
    pub fn injection_count(&self, tab: TabId) -> usize {
        self.lock()
            .tabs
            .get(&tab)
            .map(|entry| entry.injections)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumentable_urls() {
        assert!(is_instrumentable("https://example.com/watch"));
        assert!(is_instrumentable("http://localhost:8080"));
        assert!(!is_instrumentable("chrome://extensions"));
        assert!(!is_instrumentable("file:///tmp/a.html"));
    }

    #[tokio::test]
    async fn test_invalid_page_is_not_injected() {
        let host = TabHost::new(EqConfig::default());
        let tab = host.open_tab("chrome://newtab");
        let err = host.inject_equalizer(tab).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PAGE");
        assert_eq!(host.injection_count(tab), 0);
    }

    #[tokio::test]
    async fn test_closed_tab_is_a_transport_error() {
        let host = TabHost::new(EqConfig::default());
        let tab = host.open_tab("https://example.com");
        host.close_tab(tab).unwrap();

        let err = host.dispatch(tab, PageEvent::DisableEqualizer).unwrap_err();
        assert!(err.is_transport());
        let err = host.request(tab, PageRequest::GetFrequencyData).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_request_without_graph_yields_empty_data() {
        let host = TabHost::new(EqConfig::default());
        let tab = host.open_tab("https://example.com");
        let response = host.request(tab, PageRequest::GetFrequencyData).await.unwrap();
        assert_eq!(response, PageResponse::FrequencyData { data: Vec::new() });
    }

    #[tokio::test]
    async fn test_navigate_replaces_page() {
        let host = TabHost::new(EqConfig::default());
        let tab = host.open_tab("https://a.example");
        let first = host.page_id(tab).unwrap();
        let second = host.navigate(tab, "https://b.example").unwrap();
        assert_ne!(first, second);
        assert_eq!(host.url(tab).unwrap(), "https://b.example");
    }
}
