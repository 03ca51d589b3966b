use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use visitor_core::{
    update, Effect, FailureKind, Msg, PageOutcome, RunOptions, RunState, RunView, StatusEntry,
    TabId, WorkItem,
};
use visitor_logging::{visit_debug, visit_info, visit_trace, visit_warn};

use crate::errors::{classify_host_error, SetupError};
use crate::host::{Host, TabEvent};
use crate::processor::{PageHandle, PageProcessor, ProcessorError};
use crate::viewport;
use crate::watcher::{TabWatcher, WatchSignal};

/// Engine-level configuration that is not per-run user input.
#[derive(Debug, Clone)]
pub struct VisitSettings {
    /// The extension-owned blank document used to create and size the host
    /// window before any target page loads. Its origin is also how the
    /// watcher tells the placeholder apart from target pages.
    pub placeholder_url: String,
}

impl Default for VisitSettings {
    fn default() -> Self {
        Self {
            placeholder_url: "ext://visitor/pages/blank.html".to_string(),
        }
    }
}

/// Receives every accepted ledger write as it happens.
pub trait RunObserver: Send + Sync {
    fn status_changed(&self, index: usize, entry: &StatusEntry);
}

/// Observer that drops everything; for callers that only want the report.
pub struct NullObserver;

impl RunObserver for NullObserver {
    fn status_changed(&self, _index: usize, _entry: &StatusEntry) {}
}

/// Messages from per-page tasks and deadline watchdogs back into the loop.
enum TaskMsg {
    Deadline { tab_id: TabId },
    Finished { tab_id: TabId, outcome: PageOutcome },
}

/// Drive one full run: placeholder window, viewport, admission, per-page
/// processing under deadlines, teardown. Returns the final ledger transcript.
///
/// All state transitions happen through `visitor_core::update` on this one
/// logical thread; per-page tasks and watchdogs only ever report back over a
/// channel, so no two admissions can race past the concurrency cap.
pub async fn run<H, P>(
    host: Arc<H>,
    processor: Arc<P>,
    settings: &VisitSettings,
    options: RunOptions,
    items: Vec<WorkItem>,
    observer: &dyn RunObserver,
) -> Result<RunView, SetupError>
where
    H: Host + 'static,
    P: PageProcessor + 'static,
{
    let mut options = options;
    if let Some((width, height)) = processor.viewport_size() {
        options.viewport_width = width;
        options.viewport_height = height;
    }
    let deadline = options.timeout;

    // Reject bad input before the host is touched at all.
    let state = RunState::new(options, items)?;

    // Subscribe before the window exists; creating tabs first would race
    // their load-complete events against the subscription.
    let events = host.subscribe();

    processor
        .at_run_start()
        .await
        .map_err(|e| SetupError::RunStart(e.message))?;

    let (task_tx, task_rx) = mpsc::unbounded_channel();
    let mut driver = Driver {
        host,
        settings,
        observer,
        processor,
        state: Some(state),
        watcher: None,
        opened_at: HashMap::new(),
        deadline,
        task_tx,
        queue: VecDeque::new(),
        turn: 0,
        finished: false,
    };
    driver.drive(events, task_rx).await
}

struct Driver<'a, H: Host + 'static, P: PageProcessor + 'static> {
    host: Arc<H>,
    settings: &'a VisitSettings,
    observer: &'a dyn RunObserver,
    processor: Arc<P>,
    state: Option<RunState>,
    watcher: Option<TabWatcher>,
    /// When each live tab was created; the deadline counts from here.
    opened_at: HashMap<TabId, Instant>,
    deadline: Duration,
    task_tx: mpsc::UnboundedSender<TaskMsg>,
    queue: VecDeque<Msg>,
    turn: u64,
    finished: bool,
}

impl<H: Host + 'static, P: PageProcessor + 'static> Driver<'_, H, P> {
    async fn drive(
        &mut self,
        mut events: mpsc::UnboundedReceiver<TabEvent>,
        mut task_rx: mpsc::UnboundedReceiver<TaskMsg>,
    ) -> Result<RunView, SetupError> {
        self.queue.push_back(Msg::RunRequested);
        loop {
            while let Some(msg) = self.queue.pop_front() {
                self.dispatch(msg).await?;
            }
            if self.finished {
                break;
            }
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.on_tab_event(event),
                    None => {
                        self.teardown_window().await;
                        return Err(SetupError::HostGone);
                    }
                },
                task = task_rx.recv() => {
                    if let Some(task) = task {
                        self.queue.push_back(match task {
                            TaskMsg::Deadline { tab_id } => Msg::DeadlineExpired { tab_id },
                            TaskMsg::Finished { tab_id, outcome } => {
                                Msg::PageFinished { tab_id, outcome }
                            }
                        });
                    }
                }
            }
        }

        let view = self.state.as_ref().expect("state outlives the run").view();
        if let Err(err) = self.processor.at_run_end().await {
            // The results are already recorded; a failing end hook is not
            // worth failing the run over.
            visit_warn!("run-end hook failed: {}", err);
        }
        Ok(view)
    }

    /// One turn of the cooperative loop: apply the message, execute every
    /// resulting effect before the next message is looked at.
    async fn dispatch(&mut self, msg: Msg) -> Result<(), SetupError> {
        self.turn += 1;
        visitor_logging::set_turn(self.turn);
        visit_trace!("turn {}: {:?}", self.turn, msg);

        let state = self.state.take().expect("state outlives the run");
        let (state, effects) = update(state, msg);
        self.state = Some(state);
        for effect in effects {
            self.apply(effect).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, effect: Effect) -> Result<(), SetupError> {
        match effect {
            Effect::OpenWindow => {
                let window_id = self
                    .host
                    .create_window(&self.settings.placeholder_url)
                    .await
                    .map_err(SetupError::Window)?;
                self.watcher = Some(TabWatcher::new(window_id, &self.settings.placeholder_url));
                self.queue.push_back(Msg::WindowCreated { window_id });
            }
            Effect::MeasureAndResize {
                window_id,
                probe_tab,
                width,
                height,
            } => {
                match viewport::normalize(self.host.as_ref(), window_id, probe_tab, width, height)
                    .await
                {
                    Ok(()) => self.queue.push_back(Msg::ViewportNormalized),
                    Err(err) => {
                        self.teardown_window().await;
                        return Err(err.into());
                    }
                }
            }
            Effect::OpenTab {
                window_id,
                index,
                url,
            } => {
                visit_info!("opening tab for item {} url={}", index, url);
                match self.host.create_tab(window_id, &url, false).await {
                    Ok(tab_id) => {
                        self.opened_at.insert(tab_id, Instant::now());
                        self.spawn_watchdog(tab_id);
                        self.queue.push_back(Msg::TabOpened { index, tab_id });
                    }
                    Err(err) => {
                        visit_warn!("tab creation failed for item {}: {}", index, err);
                        self.queue.push_back(Msg::TabOpenFailed {
                            index,
                            message: err.to_string(),
                        });
                    }
                }
            }
            Effect::BeginProcessing { tab_id, index } => self.spawn_page_task(tab_id, index),
            Effect::CloseTab { tab_id } => {
                // The tab may already be gone; that is fine.
                if let Err(err) = self.host.remove_tab(tab_id).await {
                    visit_debug!("ignoring error closing tab {}: {}", tab_id, err);
                }
                self.opened_at.remove(&tab_id);
                if let Some(watcher) = self.watcher.as_mut() {
                    watcher.forget(tab_id);
                }
                self.queue.push_back(Msg::TabClosed { tab_id });
            }
            Effect::CloseWindow { window_id } => {
                if let Err(err) = self.host.remove_window(window_id).await {
                    visit_debug!("ignoring error closing window {}: {}", window_id, err);
                }
            }
            Effect::StatusChanged { index, entry } => {
                visit_info!("item {}: {}", index, entry.message);
                self.observer.status_changed(index, &entry);
            }
            Effect::RunFinished { aborted } => {
                visit_info!("run finished (aborted: {})", aborted);
                self.finished = true;
            }
        }
        Ok(())
    }

    fn on_tab_event(&mut self, event: TabEvent) {
        // Before our window exists no event can concern this run.
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        match watcher.classify(&event) {
            Some(WatchSignal::PlaceholderReady { tab_id }) => {
                self.queue.push_back(Msg::PlaceholderReady { tab_id });
            }
            Some(WatchSignal::PageReady { tab_id }) => {
                self.queue.push_back(Msg::PageReady { tab_id });
            }
            None => {}
        }
    }

    /// The watchdog owns the load phase of the deadline: if the page never
    /// reaches ready, this is what times the item out. Past that point the
    /// page task enforces the remainder itself and the late firing is stale.
    fn spawn_watchdog(&self, tab_id: TabId) {
        let deadline = self.deadline;
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = tx.send(TaskMsg::Deadline { tab_id });
        });
    }

    fn spawn_page_task(&self, tab_id: TabId, index: usize) {
        let elapsed = self
            .opened_at
            .get(&tab_id)
            .map(Instant::elapsed)
            .unwrap_or_default();
        let remaining = self.deadline.saturating_sub(elapsed);
        let host: Arc<dyn Host> = self.host.clone();
        let processor = self.processor.clone();
        let tx = self.task_tx.clone();
        visit_debug!(
            "processing item {} in tab {} with {:?} of the deadline left",
            index,
            tab_id,
            remaining
        );
        tokio::spawn(async move {
            let page = PageHandle::new(host, tab_id);
            let outcome =
                match tokio::time::timeout(remaining, processor.within_deadline(&page)).await {
                    Err(_) => PageOutcome::TimedOut,
                    Ok(Err(err)) => failure_outcome(err),
                    Ok(Ok(output)) => {
                        // Deadline cleared: whatever happens past this point
                        // must not be cut short mid-write.
                        match processor.after_deadline_cleared(&page, output).await {
                            Ok(summary) => PageOutcome::Succeeded { summary },
                            Err(err) => failure_outcome(err),
                        }
                    }
                };
            let _ = tx.send(TaskMsg::Finished { tab_id, outcome });
        });
    }

    async fn teardown_window(&mut self) {
        let window = self.state.as_ref().and_then(RunState::window_id);
        if let Some(window_id) = window {
            if let Err(err) = self.host.remove_window(window_id).await {
                visit_debug!("ignoring error closing window {}: {}", window_id, err);
            }
        }
    }
}

fn failure_outcome(err: ProcessorError) -> PageOutcome {
    let kind = classify_host_error(&err.message)
        .unwrap_or(FailureKind::Processor(err.message));
    PageOutcome::Failed {
        kind,
        fatal: err.fatal,
    }
}
