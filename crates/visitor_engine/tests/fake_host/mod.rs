//! Scripted in-memory host for engine tests: per-URL load latencies,
//! injectable tab-creation and script failures, and a recorded operation log
//! for asserting ordering and the concurrency bound. Emits the same noisy,
//! duplicate-prone event series a real browser does.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use visitor_core::{TabId, WindowId};
use visitor_engine::{
    Host, HostError, TabChange, TabEvent, TabSnapshot, TabStatus, WindowMetrics,
};

pub const PLACEHOLDER_URL: &str = "ext://visitor/pages/blank.html";

const CHROME_WIDTH: u32 = 16;
const CHROME_HEIGHT: u32 = 87;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateWindow,
    CreateTab { url: String },
    RemoveTab { tab_id: TabId },
    RemoveWindow,
    Resize {
        outer_width: u32,
        outer_height: u32,
    },
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    events: Option<mpsc::UnboundedSender<TabEvent>>,
    ops: Vec<HostOp>,
    window: Option<WindowId>,
    placeholder_tab: Option<TabId>,
    tab_urls: HashMap<TabId, String>,
    target_tabs: HashSet<TabId>,
    open_target_tabs: usize,
    max_open_target_tabs: usize,
    load_delays: HashMap<String, Duration>,
    failing_creates: HashSet<String>,
    failing_scripts: HashMap<String, String>,
    responses: HashMap<String, serde_json::Value>,
}

pub struct FakeHost {
    inner: Mutex<Inner>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
        })
    }

    pub fn set_load_delay(&self, url: &str, delay: Duration) {
        self.lock().load_delays.insert(url.to_string(), delay);
    }

    pub fn fail_tab_creation(&self, url: &str) {
        self.lock().failing_creates.insert(url.to_string());
    }

    /// Make `execute_in_tab` fail for pages at `url` with a raw host error.
    pub fn fail_script(&self, url: &str, message: &str) {
        self.lock()
            .failing_scripts
            .insert(url.to_string(), message.to_string());
    }

    pub fn script_response(&self, url: &str, response: serde_json::Value) {
        self.lock().responses.insert(url.to_string(), response);
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.lock().ops.clone()
    }

    /// High-water mark of concurrently open target tabs.
    pub fn max_open_tabs(&self) -> usize {
        self.lock().max_open_target_tabs
    }

    pub fn placeholder_tab(&self) -> Option<TabId> {
        self.lock().placeholder_tab
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

fn snapshot(url: &str, status: TabStatus, window_id: WindowId) -> TabSnapshot {
    TabSnapshot {
        url: url.to_string(),
        status,
        window_id,
    }
}

/// The event series a navigation produces: a blank interstitial, a loading
/// notification, then the completion event fired twice.
fn emit_navigation(
    tx: mpsc::UnboundedSender<TabEvent>,
    tab_id: TabId,
    window_id: WindowId,
    url: String,
    delay: Duration,
) {
    tokio::spawn(async move {
        let _ = tx.send(TabEvent {
            tab_id,
            change: TabChange {
                status: Some(TabStatus::Loading),
                url: None,
            },
            tab: snapshot("about:blank", TabStatus::Complete, window_id),
        });
        tokio::time::sleep(delay).await;
        let _ = tx.send(TabEvent {
            tab_id,
            change: TabChange {
                status: Some(TabStatus::Loading),
                url: Some(url.clone()),
            },
            tab: snapshot(&url, TabStatus::Loading, window_id),
        });
        let _ = tx.send(TabEvent {
            tab_id,
            change: TabChange {
                status: Some(TabStatus::Complete),
                url: None,
            },
            tab: snapshot(&url, TabStatus::Complete, window_id),
        });
        // Real hosts fire the completion event more than once.
        let _ = tx.send(TabEvent {
            tab_id,
            change: TabChange {
                status: Some(TabStatus::Complete),
                url: None,
            },
            tab: snapshot(&url, TabStatus::Complete, window_id),
        });
    });
}

#[async_trait::async_trait]
impl Host for FakeHost {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TabEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().events = Some(tx);
        rx
    }

    async fn create_window(&self, url: &str) -> Result<WindowId, HostError> {
        let (window_id, tab_id, tx) = {
            let mut inner = self.lock();
            inner.ops.push(HostOp::CreateWindow);
            inner.next_id += 1;
            let window_id = inner.next_id;
            inner.next_id += 1;
            let tab_id = inner.next_id;
            inner.window = Some(window_id);
            inner.placeholder_tab = Some(tab_id);
            inner.tab_urls.insert(tab_id, url.to_string());
            (window_id, tab_id, inner.events.clone())
        };
        if let Some(tx) = tx {
            // The placeholder document produces its own spurious updates
            // before the one that matters.
            let url = url.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                let _ = tx.send(TabEvent {
                    tab_id,
                    change: TabChange::default(),
                    tab: snapshot(&url, TabStatus::Complete, window_id),
                });
                let _ = tx.send(TabEvent {
                    tab_id,
                    change: TabChange {
                        status: Some(TabStatus::Complete),
                        url: None,
                    },
                    tab: snapshot(&url, TabStatus::Complete, window_id),
                });
                let _ = tx.send(TabEvent {
                    tab_id,
                    change: TabChange {
                        status: Some(TabStatus::Complete),
                        url: None,
                    },
                    tab: snapshot(&url, TabStatus::Complete, window_id),
                });
            });
        }
        Ok(window_id)
    }

    async fn create_tab(
        &self,
        window_id: WindowId,
        url: &str,
        _active: bool,
    ) -> Result<TabId, HostError> {
        let (tab_id, tx, delay) = {
            let mut inner = self.lock();
            inner.ops.push(HostOp::CreateTab {
                url: url.to_string(),
            });
            if inner.failing_creates.contains(url) {
                return Err(HostError::TabCreate("host out of tabs".to_string()));
            }
            inner.next_id += 1;
            let tab_id = inner.next_id;
            inner.tab_urls.insert(tab_id, url.to_string());
            inner.target_tabs.insert(tab_id);
            inner.open_target_tabs += 1;
            inner.max_open_target_tabs =
                inner.max_open_target_tabs.max(inner.open_target_tabs);
            let delay = inner
                .load_delays
                .get(url)
                .copied()
                .unwrap_or(Duration::from_millis(5));
            (tab_id, inner.events.clone(), delay)
        };
        if let Some(tx) = tx {
            emit_navigation(tx, tab_id, window_id, url.to_string(), delay);
        }
        Ok(tab_id)
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        if self.lock().tab_urls.contains_key(&tab_id) {
            Ok(())
        } else {
            Err(HostError::TabGone(tab_id))
        }
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut inner = self.lock();
        inner.ops.push(HostOp::RemoveTab { tab_id });
        if inner.tab_urls.remove(&tab_id).is_none() {
            return Err(HostError::TabGone(tab_id));
        }
        if inner.target_tabs.remove(&tab_id) {
            inner.open_target_tabs -= 1;
        }
        Ok(())
    }

    async fn remove_window(&self, window_id: WindowId) -> Result<(), HostError> {
        let mut inner = self.lock();
        inner.ops.push(HostOp::RemoveWindow);
        if inner.window.take() != Some(window_id) {
            return Err(HostError::WindowGone(window_id));
        }
        Ok(())
    }

    async fn measure_viewport(&self, tab_id: TabId) -> Result<WindowMetrics, HostError> {
        let inner = self.lock();
        match inner.tab_urls.get(&tab_id) {
            Some(url) if !url.starts_with("about:") => Ok(WindowMetrics {
                outer_width: 1024 + CHROME_WIDTH,
                outer_height: 768 + CHROME_HEIGHT,
                inner_width: 1024,
                inner_height: 768,
            }),
            Some(_) => Err(HostError::Script(
                "cannot inject into a blank document".to_string(),
            )),
            None => Err(HostError::TabGone(tab_id)),
        }
    }

    async fn resize_window(
        &self,
        window_id: WindowId,
        outer_width: u32,
        outer_height: u32,
    ) -> Result<(), HostError> {
        let mut inner = self.lock();
        if inner.window != Some(window_id) {
            return Err(HostError::WindowGone(window_id));
        }
        inner.ops.push(HostOp::Resize {
            outer_width,
            outer_height,
        });
        Ok(())
    }

    async fn execute_in_tab(
        &self,
        tab_id: TabId,
        _request: serde_json::Value,
    ) -> Result<serde_json::Value, HostError> {
        let inner = self.lock();
        let Some(url) = inner.tab_urls.get(&tab_id) else {
            return Err(HostError::Script(
                "Message manager disconnected".to_string(),
            ));
        };
        if let Some(message) = inner.failing_scripts.get(url) {
            return Err(HostError::Script(message.clone()));
        }
        Ok(inner
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "ok": true })))
    }
}
