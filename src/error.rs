//! Fault taxonomy for render passes

/// Errors surfaced by the provider, the backend, or the orchestrator.
///
/// Cancellation is a first-class variant rather than an error condition:
/// a superseded raster task rejects with it and the orchestrator treats
/// that as a silent no-op.
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("render cancelled")]
    Cancelled,

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("document closed")]
    DocumentClosed,

    #[error("provider: {detail}")]
    Provider { detail: String },

    #[error("backend: {detail}")]
    Backend { detail: String },
}

impl RenderFault {
    pub fn provider(detail: impl Into<String>) -> Self {
        Self::Provider {
            detail: detail.into(),
        }
    }

    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend {
            detail: detail.into(),
        }
    }

    /// True for the recognized cancellation signal, which is never
    /// surfaced to the caller.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
