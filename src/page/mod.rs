//! Page context
//!
//! Everything that lives inside a loaded page: the DOM model, the audio
//! graph, media discovery/attachment and the service loop that applies
//! messages from the control surface.

mod context;
mod dom;
mod graph;
mod media;
mod registry;

pub use context::PageContext;
pub use dom::{
    Document, MediaElement, MediaKind, MutationBatch, MutationObserver, NodeId, SharedDocument,
};
pub use graph::{AudioGraph, GraphParams};
pub use media::{attach_all, scan};
pub use registry::{GraphRegistry, InstanceId, PageId};
