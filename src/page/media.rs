//! Media Attacher
//!
//! One recursive scan serves both discovery paths: the initial sweep from
//! the document root and every subtree reported by the mutation observer.
//! The scan walks light children and enters each shadow root it meets.

use tracing::{debug, warn};

use super::{AudioGraph, Document, NodeId};

/// Call `on_media_discovered` for every not-yet-attached media element
/// under `root` (inclusive), including inside shadow roots
///
/// Returns the number of elements reported.
pub fn scan<F>(doc: &mut Document, root: NodeId, mut on_media_discovered: F) -> usize
where
    F: FnMut(&mut Document, NodeId),
{
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(media) = doc.media(node) {
            if !media.attached {
                found.push(node);
            }
        }
        if let Some(shadow) = doc.shadow_root(node) {
            stack.push(shadow);
        }
        // Reverse keeps document order when popping
        stack.extend(doc.children(node).iter().rev().copied());
    }

    for &node in &found {
        on_media_discovered(doc, node);
    }
    found.len()
}

/// Attach every untapped media element under `root` to the graph
///
/// Per-element failures are logged and skipped; returns how many elements
/// were newly connected.
pub fn attach_all(graph: &mut AudioGraph, doc: &mut Document, root: NodeId) -> usize {
    let mut connected = 0;
    let discovered = scan(doc, root, |doc, node| {
        match graph.connect_source(doc, node) {
            Ok(()) => connected += 1,
            Err(err) => {
                warn!(%node, code = err.error_code(), error = %err, "Media setup failed");
            }
        }
    });
    debug!(%root, discovered, connected, "Media scan finished");
    connected
}
