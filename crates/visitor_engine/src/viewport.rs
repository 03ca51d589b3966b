use thiserror::Error;

use visitor_core::{TabId, WindowId};

use crate::host::{Host, HostError, WindowMetrics};

#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("could not measure window chrome: {0}")]
    Measure(#[source] HostError),
    #[error("could not resize window: {0}")]
    Resize(#[source] HostError),
}

/// Resize `window_id` so its content area is exactly `width` x `height`.
///
/// Window dimensions are only measurable from inside a page, so the chrome
/// overhead is probed through `probe_tab`, which must host a fully loaded,
/// non-blank document. Consistent content-area size is what makes element
/// geometry comparable across runs.
pub async fn normalize(
    host: &dyn Host,
    window_id: WindowId,
    probe_tab: TabId,
    width: u32,
    height: u32,
) -> Result<(), ViewportError> {
    let metrics = host
        .measure_viewport(probe_tab)
        .await
        .map_err(ViewportError::Measure)?;
    let (outer_width, outer_height) = outer_size_for(&metrics, width, height);
    host.resize_window(window_id, outer_width, outer_height)
        .await
        .map_err(ViewportError::Resize)
}

/// The chrome overhead is the outer-minus-inner difference on each axis.
fn outer_size_for(metrics: &WindowMetrics, width: u32, height: u32) -> (u32, u32) {
    let chrome_width = metrics.outer_width.saturating_sub(metrics.inner_width);
    let chrome_height = metrics.outer_height.saturating_sub(metrics.inner_height);
    (width + chrome_width, height + chrome_height)
}
