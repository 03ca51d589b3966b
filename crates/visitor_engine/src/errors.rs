use thiserror::Error;

use visitor_core::{FailureKind, OptionsError};

use crate::host::HostError;
use crate::viewport::ViewportError;

/// Failures that abort a whole run rather than one item. None of these are
/// retried; better a loud stop than a silent hang.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid run request: {0}")]
    InvalidRequest(#[from] OptionsError),
    #[error("could not create the visiting window: {0}")]
    Window(#[source] HostError),
    #[error("viewport normalization failed: {0}")]
    Viewport(#[from] ViewportError),
    #[error("run-start hook failed: {0}")]
    RunStart(String),
    #[error("host event stream closed mid-run")]
    HostGone,
}

/// Translate a raw host error string into a named failure category, or
/// `None` when it matches nothing known and should be surfaced verbatim.
///
/// The host's own phrasings here are load-bearing: tearing a tab down while
/// scripts still run produces exactly these strings.
pub fn classify_host_error(raw: &str) -> Option<FailureKind> {
    if raw.contains("dead object") {
        return Some(FailureKind::PageTornDown);
    }
    if raw.contains("Message manager disconnected")
        || raw.contains("message channel closed")
        || raw.contains("Receiving end does not exist")
    {
        return Some(FailureKind::MessagingDisconnected);
    }
    None
}
