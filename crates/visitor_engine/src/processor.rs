use std::fmt;
use std::sync::Arc;

use visitor_core::TabId;

use crate::host::{Host, HostError};

/// A loaded page handed to the processor: the tab plus the messaging surface
/// needed to drive page-side logic.
pub struct PageHandle {
    host: Arc<dyn Host>,
    tab_id: TabId,
}

impl PageHandle {
    pub(crate) fn new(host: Arc<dyn Host>, tab_id: TabId) -> Self {
        Self { host, tab_id }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Foreground the tab. Some page-side work only behaves in an active
    /// tab.
    pub async fn activate(&self) -> Result<(), ProcessorError> {
        self.host.activate_tab(self.tab_id).await.map_err(Into::into)
    }

    /// Inject the page-side script and exchange one request/response
    /// message with it.
    pub async fn exchange(
        &self,
        request: serde_json::Value,
    ) -> Result<serde_json::Value, ProcessorError> {
        self.host
            .execute_in_tab(self.tab_id, request)
            .await
            .map_err(Into::into)
    }
}

/// Failure from the processor's own logic, or a host error it passed
/// through. `fatal` failures abort the whole run instead of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorError {
    pub message: String,
    pub fatal: bool,
}

impl ProcessorError {
    /// Fails this item only; the run continues.
    pub fn item(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    /// Aborts the whole run.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProcessorError {}

impl From<HostError> for ProcessorError {
    fn from(err: HostError) -> Self {
        ProcessorError::item(err.to_string())
    }
}

/// Per-page work plugged into the scheduler: serialize a snapshot, run a
/// ruleset, extract a feature vector. The scheduler knows nothing about the
/// internals; it only drives the lifecycle hooks.
#[async_trait::async_trait]
pub trait PageProcessor: Send + Sync {
    /// Whatever phase one produces and phase two consumes.
    type Output: Send;

    /// Page geometry this processor requires, overriding the run options.
    fn viewport_size(&self) -> Option<(u32, u32)> {
        None
    }

    async fn at_run_start(&self) -> Result<(), ProcessorError> {
        Ok(())
    }

    /// Phase one, raced against the item's remaining deadline. Losing the
    /// race fails the item with a timeout.
    async fn within_deadline(&self, page: &PageHandle) -> Result<Self::Output, ProcessorError>;

    /// Phase two, run only if phase one resolved in time and never
    /// interrupted by the deadline; cancelling mid-write is worse than a
    /// late write. The returned message becomes the item's final ledger
    /// entry.
    async fn after_deadline_cleared(
        &self,
        page: &PageHandle,
        output: Self::Output,
    ) -> Result<Option<String>, ProcessorError> {
        let _ = (page, output);
        Ok(None)
    }

    async fn at_run_end(&self) -> Result<(), ProcessorError> {
        Ok(())
    }
}
