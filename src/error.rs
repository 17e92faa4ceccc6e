//! Error handling for tabeq
//!
//! Nothing in the equalizer core is fatal: every variant degrades to
//! "equalizer inactive for this element/page". Callers log and continue.

use thiserror::Error;

use crate::bus::TabId;

/// Result type alias for tabeq operations
pub type Result<T> = std::result::Result<T, EqError>;

/// Main error type for tabeq operations
#[derive(Error, Debug)]
pub enum EqError {
    // Attachment Errors
    #[error("Media element {element} is already tapped by another graph")]
    AlreadyTapped { element: usize },

    #[error("Host refuses to tap media element {element}")]
    HostRestricted { element: usize },

    #[error("Node {node} is not a media element")]
    NotMediaElement { node: usize },

    #[error("Unknown DOM node: {node}")]
    UnknownNode { node: usize },

    // Transport Errors
    #[error("Tab {tab} has no live page context")]
    PageUnavailable { tab: TabId },

    #[error("Unknown tab: {tab}")]
    UnknownTab { tab: TabId },

    #[error("Page context dropped the reply for tab {tab}")]
    ReplyDropped { tab: TabId },

    #[error("Unexpected reply from page: {reason}")]
    UnexpectedReply { reason: String },

    // Page Errors
    #[error("Page cannot be instrumented: {url}")]
    InvalidPage { url: String },

    // Parameter Errors
    #[error("Invalid parameter {param}={value}, expected {expected}")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Unknown equalizer field: {name}")]
    UnknownField { name: String },

    #[error("Unknown preset: {name}")]
    UnknownPreset { name: String },

    // Config Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Codec Errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EqError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EqError::AlreadyTapped { .. } => "ALREADY_TAPPED",
            EqError::HostRestricted { .. } => "HOST_RESTRICTED",
            EqError::NotMediaElement { .. } => "NOT_MEDIA_ELEMENT",
            EqError::UnknownNode { .. } => "UNKNOWN_NODE",
            EqError::PageUnavailable { .. } => "PAGE_UNAVAILABLE",
            EqError::UnknownTab { .. } => "UNKNOWN_TAB",
            EqError::ReplyDropped { .. } => "REPLY_DROPPED",
            EqError::UnexpectedReply { .. } => "UNEXPECTED_REPLY",
            EqError::InvalidPage { .. } => "INVALID_PAGE",
            EqError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EqError::UnknownField { .. } => "UNKNOWN_FIELD",
            EqError::UnknownPreset { .. } => "UNKNOWN_PRESET",
            EqError::InvalidConfig { .. } => "INVALID_CONFIG",
            EqError::Wav(_) => "WAV_ERROR",
            EqError::Io(_) => "IO_ERROR",
            EqError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error leaves the equalizer usable (logged no-op)
    pub fn is_recoverable(&self) -> bool {
        match self {
            EqError::AlreadyTapped { .. }
            | EqError::HostRestricted { .. }
            | EqError::NotMediaElement { .. }
            | EqError::UnknownNode { .. }
            | EqError::PageUnavailable { .. }
            | EqError::UnknownTab { .. }
            | EqError::ReplyDropped { .. }
            | EqError::InvalidPage { .. }
            | EqError::InvalidParameter { .. }
            | EqError::UnknownField { .. }
            | EqError::UnknownPreset { .. } => true,
            _ => false,
        }
    }

    /// True for failures caused by the target page no longer existing
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EqError::PageUnavailable { .. }
                | EqError::UnknownTab { .. }
                | EqError::ReplyDropped { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EqError::AlreadyTapped { element: 3 };
        assert_eq!(err.error_code(), "ALREADY_TAPPED");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_transport_classification() {
        assert!(EqError::PageUnavailable { tab: TabId(1) }.is_transport());
        assert!(!EqError::HostRestricted { element: 0 }.is_transport());
        assert!(!EqError::InvalidConfig {
            reason: "x".to_string()
        }
        .is_recoverable());
    }
}
