use std::fmt;

/// Why a single page visit failed, translated from whatever low-level string
/// the host produced. Raw host errors are not actionable when debugging a
/// failed batch run, so `Display` renders the reworded form shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The tab's DOM vanished while we were still working on it.
    PageTornDown,
    /// The content messaging channel closed, usually because the tab closed.
    MessagingDisconnected,
    /// The host refused to open a tab for this item.
    TabOpenFailed(String),
    /// The processor's own logic failed; message surfaced verbatim.
    Processor(String),
    /// Any other host-side error, surfaced verbatim.
    Other(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::PageTornDown => write!(
                f,
                "unexpected removal of a DOM element (can't access dead object); \
                 try a longer settle delay"
            ),
            FailureKind::MessagingDisconnected => {
                write!(f, "tab unexpectedly closed (message channel disconnected)")
            }
            FailureKind::TabOpenFailed(message) => write!(f, "could not open tab: {message}"),
            FailureKind::Processor(message) => write!(f, "{message}"),
            FailureKind::Other(message) => write!(f, "{message}"),
        }
    }
}

/// Terminal outcome of one dispatched page, reported back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Succeeded {
        /// Optional final ledger message, e.g. "saved as example.com.html".
        summary: Option<String>,
    },
    Failed {
        kind: FailureKind,
        /// Fatal failures abort the whole run instead of just this item.
        fatal: bool,
    },
    TimedOut,
}
