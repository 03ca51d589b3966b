use std::collections::HashSet;

use url::Url;

use visitor_core::{TabId, WindowId};

use crate::host::{TabEvent, TabStatus};

/// URLs the host shows while a tab has nowhere real to be yet.
const BLANK_SENTINELS: &[&str] = &["about:blank", "about:newtab"];

/// One meaningful transition distilled from the raw tab-change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    /// The run's own placeholder document finished loading.
    PlaceholderReady { tab_id: TabId },
    /// A target page finished loading.
    PageReady { tab_id: TabId },
}

/// Filters the host's noisy, duplicate-prone tab-change feed down to exactly
/// one signal per meaningful transition.
///
/// De-duplication keys on a per-tab-id set rather than remembering only the
/// most recent dispatch; with several tabs loading concurrently their
/// duplicate completion events interleave, and a one-slot memo lets repeats
/// through.
pub struct TabWatcher {
    window_id: WindowId,
    placeholder_url: String,
    placeholder_scheme: Option<String>,
    placeholder_host: Option<String>,
    dispatched: HashSet<TabId>,
}

impl TabWatcher {
    pub fn new(window_id: WindowId, placeholder_url: &str) -> Self {
        let parsed = Url::parse(placeholder_url).ok();
        Self {
            window_id,
            placeholder_url: placeholder_url.to_string(),
            placeholder_scheme: parsed.as_ref().map(|u| u.scheme().to_string()),
            placeholder_host: parsed
                .as_ref()
                .and_then(|u| u.host_str().map(str::to_string)),
            dispatched: HashSet::new(),
        }
    }

    /// Classify one raw event. Filters apply in order: foreign window, blank
    /// sentinel, incomplete load, already dispatched, then the
    /// placeholder/target split by URL origin.
    pub fn classify(&mut self, event: &TabEvent) -> Option<WatchSignal> {
        if event.tab.window_id != self.window_id {
            return None;
        }
        if BLANK_SENTINELS.contains(&event.tab.url.as_str()) {
            return None;
        }
        if event.tab.status != TabStatus::Complete {
            return None;
        }
        if self.dispatched.contains(&event.tab_id) {
            return None;
        }

        if self.is_placeholder(&event.tab.url) {
            // The placeholder document produces several update events beyond
            // the load itself; only the one carrying the completion
            // transition counts.
            if event.change.status != Some(TabStatus::Complete) {
                return None;
            }
            self.dispatched.insert(event.tab_id);
            Some(WatchSignal::PlaceholderReady {
                tab_id: event.tab_id,
            })
        } else {
            self.dispatched.insert(event.tab_id);
            Some(WatchSignal::PageReady {
                tab_id: event.tab_id,
            })
        }
    }

    /// Drop the dispatch memo for a closed tab so the set stays bounded.
    pub fn forget(&mut self, tab_id: TabId) {
        self.dispatched.remove(&tab_id);
    }

    fn is_placeholder(&self, url: &str) -> bool {
        match (Url::parse(url), &self.placeholder_scheme) {
            (Ok(parsed), Some(scheme)) => {
                parsed.scheme() == scheme
                    && parsed.host_str().map(str::to_string) == self.placeholder_host
            }
            _ => url.starts_with(&self.placeholder_url),
        }
    }
}
