//! Acquire context: per-call cancellation

use tokio_util::sync::CancellationToken;

/// Options for a single acquire call
///
/// The default context never cancels; attach a [`CancellationToken`] to
/// let the caller abandon the wait early (for example when the request
/// that needed the resource has itself been aborted).
#[derive(Debug, Clone, Default)]
pub struct AcquireContext {
    cancellation: Option<CancellationToken>,
}

impl AcquireContext {
    /// A context that never cancels
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that cancels when `token` is cancelled
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
        }
    }

    /// The attached cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Resolves when the context is cancelled; pends forever otherwise
    pub(crate) async fn cancelled(&self) {
        match &self.cancellation {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
