use crate::{StatusEntry, TabId, WindowId};

/// Side effects requested by `update`. The driver executes each against the
/// host and feeds the consequence back in as a `Msg` within the same turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the placeholder window that will host all target tabs.
    OpenWindow,
    /// Measure chrome overhead through the placeholder tab, then resize the
    /// host window so the content area matches the requested viewport.
    MeasureAndResize {
        window_id: WindowId,
        probe_tab: TabId,
        width: u32,
        height: u32,
    },
    /// Open an inactive tab for the item at `index`.
    OpenTab {
        window_id: WindowId,
        index: usize,
        url: String,
    },
    /// Hand the loaded page to the processor under the remaining deadline.
    BeginProcessing { tab_id: TabId, index: usize },
    /// Tear down a tab. Errors on an already-closed tab are swallowed.
    CloseTab { tab_id: TabId },
    /// Tear down the host window.
    CloseWindow { window_id: WindowId },
    /// A ledger write was accepted; observers should be told.
    StatusChanged { index: usize, entry: StatusEntry },
    /// The run is over; exactly one of these is emitted per run.
    RunFinished { aborted: bool },
}
