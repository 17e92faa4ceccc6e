//! Message types crossing the context boundary

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::TabId;
use crate::dsp::AudioBuffer;
use crate::page::GraphParams;
use crate::settings::EqUpdate;

/// Control surface -> coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    #[serde(rename_all = "camelCase")]
    ToggleChanged { tab_id: TabId, enabled: bool },
}

/// In-page signals; fire-and-forget, applied in send order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum PageEvent {
    /// Build the audio graph and start attaching media (idempotent)
    InstallEqualizer,
    /// Partial or full settings for `AudioGraph::apply_update`
    UpdateEqualizer(EqUpdate),
    /// Force neutral parameters
    DisableEqualizer,
    /// Reapply the retained snapshot
    EnableEqualizer,
    /// Click or keydown inside the page; resumes a suspended audio context
    UserGesture,
}

/// Pull requests answered by the page context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    GetFrequencyData,
    GetGraphParams,
    /// Run a block of source audio through the graph
    Render { block: AudioBuffer },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PageResponse {
    /// 0-255 analyser bins; empty when no graph is installed
    FrequencyData { data: Vec<u8> },
    GraphParams { params: Option<GraphParams> },
    Rendered { block: AudioBuffer },
}

/// One item in a page context's inbound queue
#[derive(Debug)]
pub enum PageEnvelope {
    Event(PageEvent),
    Request(PageRequest, oneshot::Sender<PageResponse>),
}
