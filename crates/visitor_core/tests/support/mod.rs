//! Pure in-memory driver for scheduler tests: executes effects by feeding
//! the consequences back into `update`, the way the real controller does,
//! but without a host or a clock.

use std::collections::BTreeSet;

use visitor_core::{
    Effect, Msg, PageOutcome, RunOptions, RunState, RunView, TabId, WorkItem,
};

const WINDOW_ID: u64 = 7;

/// One recorded host interaction, for asserting ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    OpenTab { index: usize, url: String },
    CloseTab { tab_id: TabId },
    CloseWindow,
}

pub struct Sim {
    state: Option<RunState>,
    next_tab: TabId,
    open: BTreeSet<TabId>,
    pub max_open: usize,
    pub ops: Vec<HostOp>,
    pub processing: Vec<(TabId, usize)>,
    pub finished: Option<bool>,
    fail_open_indices: BTreeSet<usize>,
}

impl Sim {
    pub fn new(options: RunOptions, items: Vec<WorkItem>) -> Self {
        let state = RunState::new(options, items).expect("valid run");
        Self {
            state: Some(state),
            next_tab: 100,
            open: BTreeSet::new(),
            max_open: 0,
            ops: Vec::new(),
            processing: Vec::new(),
            finished: None,
            fail_open_indices: BTreeSet::new(),
        }
    }

    /// Make tab creation fail for the given item index.
    pub fn fail_open_for(&mut self, index: usize) {
        self.fail_open_indices.insert(index);
    }

    /// Drive the run up to the point where the first tabs are open.
    pub fn start(&mut self) {
        self.dispatch(Msg::RunRequested);
    }

    /// The page in `tab` finished loading.
    pub fn ready(&mut self, tab: TabId) {
        self.dispatch(Msg::PageReady { tab_id: tab });
    }

    /// The per-page task delivered an outcome for `tab`.
    pub fn finish(&mut self, tab: TabId, outcome: PageOutcome) {
        self.dispatch(Msg::PageFinished {
            tab_id: tab,
            outcome,
        });
    }

    pub fn succeed(&mut self, tab: TabId) {
        self.finish(tab, PageOutcome::Succeeded { summary: None });
    }

    /// The load-phase watchdog fired for `tab`.
    pub fn expire(&mut self, tab: TabId) {
        self.dispatch(Msg::DeadlineExpired { tab_id: tab });
    }

    pub fn view(&self) -> RunView {
        self.state.as_ref().expect("state present").view()
    }

    /// Tabs currently open, lowest id first.
    pub fn open_tabs(&self) -> Vec<TabId> {
        self.open.iter().copied().collect()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = self.state.take().expect("state present");
        let (state, effects) = visitor_core::update(state, msg);
        self.state = Some(state);
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenWindow => {
                self.dispatch(Msg::WindowCreated {
                    window_id: WINDOW_ID,
                });
                // The placeholder document loads and the viewport settles
                // immediately in the pure simulation.
                self.dispatch(Msg::PlaceholderReady { tab_id: 1 });
            }
            Effect::MeasureAndResize { .. } => {
                self.dispatch(Msg::ViewportNormalized);
            }
            Effect::OpenTab { index, url, .. } => {
                self.ops.push(HostOp::OpenTab {
                    index,
                    url: url.clone(),
                });
                if self.fail_open_indices.contains(&index) {
                    self.dispatch(Msg::TabOpenFailed {
                        index,
                        message: "host out of tabs".to_string(),
                    });
                } else {
                    self.next_tab += 1;
                    let tab_id = self.next_tab;
                    self.open.insert(tab_id);
                    self.max_open = self.max_open.max(self.open.len());
                    self.dispatch(Msg::TabOpened { index, tab_id });
                }
            }
            Effect::BeginProcessing { tab_id, index } => {
                self.processing.push((tab_id, index));
            }
            Effect::CloseTab { tab_id } => {
                self.ops.push(HostOp::CloseTab { tab_id });
                self.open.remove(&tab_id);
                self.dispatch(Msg::TabClosed { tab_id });
            }
            Effect::CloseWindow { .. } => {
                self.ops.push(HostOp::CloseWindow);
            }
            Effect::StatusChanged { .. } => {}
            Effect::RunFinished { aborted } => {
                assert!(
                    self.finished.is_none(),
                    "run finished more than once"
                );
                self.finished = Some(aborted);
            }
        }
    }
}

pub fn items(urls: &[&str]) -> Vec<WorkItem> {
    urls.iter()
        .map(|url| WorkItem {
            url: url.to_string(),
            filename: visitor_core::filename_for_url(url),
        })
        .collect()
}
