use crate::{PageOutcome, TabId, WindowId};

/// Everything that can happen to a run, funneled through one dispatch
/// function. The driver feeds these in; `update` owns all state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller asked for the run to begin.
    RunRequested,
    /// Host created the placeholder window.
    WindowCreated { window_id: WindowId },
    /// Watcher saw the placeholder document finish loading.
    PlaceholderReady { tab_id: TabId },
    /// Viewport normalization finished; admissions may start.
    ViewportNormalized,
    /// Host created a tab for the item at `index`.
    TabOpened { index: usize, tab_id: TabId },
    /// Host refused to create a tab for the item at `index`.
    TabOpenFailed { index: usize, message: String },
    /// Watcher saw a target page finish loading.
    PageReady { tab_id: TabId },
    /// The full per-item deadline elapsed. Only meaningful while the page is
    /// still loading; later arrivals are stale and ignored.
    DeadlineExpired { tab_id: TabId },
    /// The per-page task delivered this page's terminal outcome.
    PageFinished { tab_id: TabId, outcome: PageOutcome },
    /// Host confirmed a tab teardown.
    TabClosed { tab_id: TabId },
}
