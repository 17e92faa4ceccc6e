//! Page context service
//!
//! One task per loaded page. It owns the page's audio graph and processes a
//! single inbound queue strictly in order, interleaved with mutation batches
//! from the document observer. The task ends when the queue closes
//! (navigation or tab close), which also disconnects the observer.

use std::sync::{Arc, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    attach_all, AudioGraph, GraphRegistry, MutationBatch, MutationObserver, NodeId, PageId,
    SharedDocument,
};
use crate::bus::{PageEnvelope, PageEvent, PageRequest, PageResponse};
use crate::config::EqConfig;

pub struct PageContext {
    page: PageId,
    document: SharedDocument,
    registry: GraphRegistry,
    config: Arc<EqConfig>,
    graph: Option<AudioGraph>,
}

impl PageContext {
    pub fn new(
        page: PageId,
        document: SharedDocument,
        registry: GraphRegistry,
        config: Arc<EqConfig>,
    ) -> Self {
        Self {
            page,
            document,
            registry,
            config,
            graph: None,
        }
    }

    /// Service loop; returns once every sender of `inbox` is gone
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<PageEnvelope>) {
        debug!(page = %self.page, "Page context started");
        let mut observer: Option<MutationObserver> = None;

        loop {
            let wake = tokio::select! {
                envelope = inbox.recv() => Wake::Inbox(envelope),
                batch = next_batch(&mut observer) => Wake::Mutations(batch),
            };

            match wake {
                Wake::Inbox(Some(PageEnvelope::Event(PageEvent::InstallEqualizer))) => {
                    if let Some(installed) = self.install() {
                        observer = Some(installed);
                    }
                }
                Wake::Inbox(Some(PageEnvelope::Event(event))) => self.handle_event(event),
                Wake::Inbox(Some(PageEnvelope::Request(request, reply))) => {
                    let response = self.handle_request(request);
                    if reply.send(response).is_err() {
                        debug!(page = %self.page, "Requester went away");
                    }
                }
                Wake::Inbox(None) => break,
                Wake::Mutations(Some(batch)) => self.on_mutations(&batch.added),
                Wake::Mutations(None) => observer = None,
            }
        }

        if self.graph.is_some() {
            self.registry.release(self.page);
        }
        info!(page = %self.page, "Page context torn down");
    }

    /// Build the graph, sweep the document and start observing it
    ///
    /// Returns `None` when this page already has a graph.
    fn install(&mut self) -> Option<MutationObserver> {
        if self.graph.is_some() {
            debug!(page = %self.page, "Equalizer already installed");
            return None;
        }
        let instance = self.registry.claim(self.page)?;
        let mut graph = match AudioGraph::new(instance, &self.config) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(page = %self.page, error = %err, "Audio graph construction failed");
                self.registry.release(self.page);
                return None;
            }
        };

        let mut doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        // Subscribe before sweeping so nothing inserted in between is missed
        let observer = doc.observe();
        let root = doc.root();
        let connected = attach_all(&mut graph, &mut doc, root);
        drop(doc);

        info!(page = %self.page, %instance, connected, "Equalizer injected and observing media elements");
        self.graph = Some(graph);
        Some(observer)
    }

    fn on_mutations(&mut self, added: &[NodeId]) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        let mut doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        for &node in added {
            attach_all(graph, &mut doc, node);
        }
    }

    fn handle_event(&mut self, event: PageEvent) {
        let page = self.page;
        let Some(graph) = self.graph.as_mut() else {
            debug!(%page, ?event, "No equalizer on page, event ignored");
            return;
        };
        match event {
            PageEvent::InstallEqualizer => {}
            PageEvent::UpdateEqualizer(update) => graph.apply_update(&update),
            PageEvent::DisableEqualizer => graph.set_enabled(false),
            PageEvent::EnableEqualizer => graph.set_enabled(true),
            PageEvent::UserGesture => graph.resume(),
        }
    }

    fn handle_request(&mut self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::GetFrequencyData => PageResponse::FrequencyData {
                data: self
                    .graph
                    .as_mut()
                    .map(AudioGraph::frequency_data)
                    .unwrap_or_default(),
            },
            PageRequest::GetGraphParams => PageResponse::GraphParams {
                params: self.graph.as_ref().map(AudioGraph::params),
            },
            PageRequest::Render { mut block } => {
                // Without a graph the page plays its media untouched
                if let Some(graph) = self.graph.as_mut() {
                    graph.process(&mut block);
                }
                PageResponse::Rendered { block }
            }
        }
    }
}

enum Wake {
    Inbox(Option<PageEnvelope>),
    Mutations(Option<MutationBatch>),
}

async fn next_batch(observer: &mut Option<MutationObserver>) -> Option<MutationBatch> {
    match observer {
        Some(observer) => observer.next_batch().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Document, MediaKind};
    use crate::settings::{EqField, EqUpdate};

    fn context() -> PageContext {
        PageContext::new(
            PageId::new(),
            Document::shared(),
            GraphRegistry::new(),
            Arc::new(EqConfig::default()),
        )
    }

    #[test]
    fn test_install_is_idempotent() {
        let mut ctx = context();
        assert!(ctx.install().is_some());
        assert!(ctx.install().is_none());
        assert_eq!(ctx.registry.len(), 1);
    }

    #[test]
    fn test_events_before_install_are_ignored() {
        let mut ctx = context();
        ctx.handle_event(PageEvent::UpdateEqualizer(EqUpdate::single(EqField::Bass, 5.0)));
        assert!(ctx.graph.is_none());
        match ctx.handle_request(PageRequest::GetGraphParams) {
            PageResponse::GraphParams { params } => assert!(params.is_none()),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_mutations_attach_new_media() {
        let mut ctx = context();
        let mut observer = ctx.install().unwrap();

        let video = {
            let mut doc = ctx.document.lock().unwrap();
            let div = doc.create_element("div");
            let video = doc.create_media(MediaKind::Video);
            doc.append_child(div, video).unwrap();
            let root = doc.root();
            doc.append_child(root, div).unwrap();
            video
        };
        let batch = observer.try_next_batch().unwrap();
        ctx.on_mutations(&batch.added);

        assert_eq!(ctx.graph.as_ref().unwrap().sources(), &[video]);
        assert!(ctx.document.lock().unwrap().media(video).unwrap().attached);
    }
}
