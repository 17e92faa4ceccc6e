//! Page DOM model
//!
//! Arena of element nodes with shadow roots (encapsulated subtrees that a
//! plain child walk does not enter) and a mutation observer reporting every
//! subtree inserted into the connected tree.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use super::InstanceId;
use crate::error::{EqError, Result};

/// Document shared between the page context and page scripts
pub type SharedDocument = Arc<Mutex<Document>>;

/// Index of a node in its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn tag(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Media-element state relevant to graph attachment
#[derive(Debug, Clone, PartialEq)]
pub struct MediaElement {
    pub kind: MediaKind,
    /// One-time "already attached to our graph" marker
    pub attached: bool,
    /// Graph (ours or foreign) currently pulling audio from the element
    pub tapped_by: Option<InstanceId>,
    /// Host refuses any tap, e.g. cross-origin media
    pub restricted: bool,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    media: Option<MediaElement>,
}

/// Subtrees inserted by one DOM operation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBatch {
    pub added: Vec<NodeId>,
}

/// Receiving end of a document subscription; dropping it disconnects
#[derive(Debug)]
pub struct MutationObserver {
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
}

impl MutationObserver {
    /// Wait for the next batch; `None` once the document is gone
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }

    /// Take a pending batch without waiting
    pub fn try_next_batch(&mut self) -> Option<MutationBatch> {
        self.receiver.try_recv().ok()
    }
}

/// A page document
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    observers: Vec<mpsc::UnboundedSender<MutationBatch>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document holding only the root element
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "html".to_string(),
                parent: None,
                children: Vec::new(),
                shadow_root: None,
                media: None,
            }],
            observers: Vec::new(),
        }
    }

    pub fn shared() -> SharedDocument {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(EqError::UnknownNode { node: id.0 })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or(EqError::UnknownNode { node: id.0 })
    }

    fn push(&mut self, tag: &str, media: Option<MediaElement>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_string(),
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            media,
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(tag, None)
    }

    /// Create a detached `<audio>` or `<video>` element
    pub fn create_media(&mut self, kind: MediaKind) -> NodeId {
        self.push(
            kind.tag(),
            Some(MediaElement {
                kind,
                attached: false,
                tapped_by: None,
                restricted: false,
            }),
        )
    }

    /// Shadow root of `host`, created on first call
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId> {
        if let Some(existing) = self.node(host)?.shadow_root {
            return Ok(existing);
        }
        let root = self.push("#shadow-root", None);
        self.node_mut(root)?.parent = Some(host);
        self.node_mut(host)?.shadow_root = Some(root);
        Ok(root)
    }

    /// Append `child` (with its subtree) under `parent`
    ///
    /// Observers are notified when the insertion lands in the connected tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(EqError::InvalidParameter {
                param: "child".to_string(),
                value: child.to_string(),
                expected: "a node that is not an ancestor of the parent".to_string(),
            });
        }
        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?.children.retain(|&c| c != child);
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);

        if self.is_connected(parent) {
            self.notify(MutationBatch { added: vec![child] });
        }
        Ok(())
    }

    fn is_ancestor(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// True when the node hangs off the document root (through shadow hosts too)
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root() || self.is_ancestor(self.root(), node)
    }

    fn notify(&mut self, batch: MutationBatch) {
        self.observers
            .retain(|observer| observer.send(batch.clone()).is_ok());
    }

    /// Subscribe to insertions anywhere in the connected tree
    pub fn observe(&mut self) -> MutationObserver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.observers.push(sender);
        MutationObserver { receiver }
    }

    /// Number of live observers (disconnected ones are pruned on the next insertion)
    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|o| !o.is_closed()).count()
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.tag.as_str())
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.shadow_root)
    }

    pub fn media(&self, node: NodeId) -> Option<&MediaElement> {
        self.nodes.get(node.0).and_then(|n| n.media.as_ref())
    }

    fn media_mut(&mut self, node: NodeId) -> Result<&mut MediaElement> {
        self.node_mut(node)?
            .media
            .as_mut()
            .ok_or(EqError::NotMediaElement { node: node.0 })
    }

    /// Every media element in the arena, connected or not
    pub fn media_elements(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.media.is_some())
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Make the host refuse any tap on this element
    pub fn restrict_media(&mut self, node: NodeId) -> Result<()> {
        self.media_mut(node)?.restricted = true;
        Ok(())
    }

    /// Route the element's audio into `owner`
    ///
    /// An element can be tapped once, by one owner, for its whole lifetime.
    pub fn tap_media(&mut self, node: NodeId, owner: InstanceId) -> Result<()> {
        let media = self.media_mut(node)?;
        if media.restricted {
            return Err(EqError::HostRestricted { element: node.0 });
        }
        if media.tapped_by.is_some() {
            return Err(EqError::AlreadyTapped { element: node.0 });
        }
        media.tapped_by = Some(owner);
        Ok(())
    }

    /// Set the one-time attachment marker
    pub fn mark_attached(&mut self, node: NodeId) -> Result<()> {
        self.media_mut(node)?.attached = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_connected_notifies() {
        let mut doc = Document::new();
        let mut observer = doc.observe();

        let div = doc.create_element("div");
        let video = doc.create_media(MediaKind::Video);
        doc.append_child(div, video).unwrap();
        assert!(observer.try_next_batch().is_none(), "detached insert is silent");

        doc.append_child(doc.root(), div).unwrap();
        assert_eq!(
            observer.try_next_batch(),
            Some(MutationBatch { added: vec![div] })
        );
        assert!(doc.is_connected(video));
    }

    #[test]
    fn test_shadow_root_is_connected_through_host() {
        let mut doc = Document::new();
        let host = doc.create_element("player-shell");
        doc.append_child(doc.root(), host).unwrap();
        let shadow = doc.attach_shadow(host).unwrap();
        assert_eq!(doc.attach_shadow(host).unwrap(), shadow);
        assert!(doc.children(host).is_empty());

        let mut observer = doc.observe();
        let audio = doc.create_media(MediaKind::Audio);
        doc.append_child(shadow, audio).unwrap();
        assert_eq!(observer.try_next_batch().unwrap().added, vec![audio]);
    }

    #[test]
    fn test_tap_media_only_once() {
        let mut doc = Document::new();
        let audio = doc.create_media(MediaKind::Audio);
        let owner = InstanceId::new();
        doc.tap_media(audio, owner).unwrap();
        let err = doc.tap_media(audio, owner).unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_TAPPED");

        let div = doc.create_element("div");
        assert_eq!(
            doc.tap_media(div, owner).unwrap_err().error_code(),
            "NOT_MEDIA_ELEMENT"
        );
    }

    #[test]
    fn test_restricted_media_refuses_tap() {
        let mut doc = Document::new();
        let video = doc.create_media(MediaKind::Video);
        doc.restrict_media(video).unwrap();
        let err = doc.tap_media(video, InstanceId::new()).unwrap_err();
        assert_eq!(err.error_code(), "HOST_RESTRICTED");
        assert!(doc.media(video).unwrap().tapped_by.is_none());
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let mut doc = Document::new();
        let observer = doc.observe();
        assert_eq!(doc.observer_count(), 1);
        drop(observer);
        let div = doc.create_element("div");
        doc.append_child(doc.root(), div).unwrap();
        assert_eq!(doc.observer_count(), 0);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(outer, inner).unwrap();
        assert!(doc.append_child(inner, outer).is_err());
    }
}
