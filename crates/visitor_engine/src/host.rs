use thiserror::Error;
use tokio::sync::mpsc;

use visitor_core::{TabId, WindowId};

/// Load state of a tab as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

/// The partial change descriptor attached to a tab-state-change event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabChange {
    pub status: Option<TabStatus>,
    pub url: Option<String>,
}

/// Full tab state at the time an event fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub url: String,
    pub status: TabStatus,
    pub window_id: WindowId,
}

/// One raw notification from the host's tab-state-change feed. The host
/// fires several of these per navigation, including duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabEvent {
    pub tab_id: TabId,
    pub change: TabChange,
    pub tab: TabSnapshot,
}

/// Outer and inner dimensions of a window, measured through a live tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("window {0} is gone")]
    WindowGone(WindowId),
    #[error("tab {0} is gone")]
    TabGone(TabId),
    #[error("host refused to create a tab: {0}")]
    TabCreate(String),
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("{0}")]
    Other(String),
}

/// The browser surface the engine drives. Fixed by the host environment; the
/// engine must cope with its event timing rather than the other way around.
#[async_trait::async_trait]
pub trait Host: Send + Sync {
    /// Subscribe to the raw tab-state-change feed. Must be called before the
    /// first window is created or early events are lost.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TabEvent>;

    async fn create_window(&self, url: &str) -> Result<WindowId, HostError>;

    /// Open a tab in `window_id`. Inactive tabs do not steal focus.
    async fn create_tab(
        &self,
        window_id: WindowId,
        url: &str,
        active: bool,
    ) -> Result<TabId, HostError>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Close a tab. Errors on an already-closed tab are the caller's to
    /// swallow.
    async fn remove_tab(&self, tab_id: TabId) -> Result<(), HostError>;

    async fn remove_window(&self, window_id: WindowId) -> Result<(), HostError>;

    /// Measure window chrome through `tab_id`, which must host a fully
    /// loaded, non-blank document (script injection fails on blank pages).
    async fn measure_viewport(&self, tab_id: TabId) -> Result<WindowMetrics, HostError>;

    async fn resize_window(
        &self,
        window_id: WindowId,
        outer_width: u32,
        outer_height: u32,
    ) -> Result<(), HostError>;

    /// Inject the page-side script into a tab and exchange one
    /// request/response message with it.
    async fn execute_in_tab(
        &self,
        tab_id: TabId,
        request: serde_json::Value,
    ) -> Result<serde_json::Value, HostError>;
}
