use std::collections::BTreeMap;

use crate::view_model::{ItemRowView, RunView};
use crate::{OptionsError, RunOptions, StatusEntry, StatusLedger, WorkItem};

/// Host-assigned tab identifier.
pub type TabId = u64;
/// Host-assigned window identifier.
pub type WindowId = u64;

/// Coarse progression of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    WindowOpening,
    Sizing,
    Visiting,
    Done,
}

/// Per-item state machine. Every item moves through this exactly once:
/// `Unstarted -> Opening -> Loading -> Processing -> terminal`, where the
/// terminal states are `Succeeded`, `Failed` and `TimedOut`. Items whose tab
/// never gets created skip straight from `Opening` to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Unstarted,
    /// Admission issued; waiting for the host to confirm tab creation.
    Opening,
    Loading { tab: TabId },
    Processing { tab: TabId },
    Succeeded,
    Failed,
    TimedOut,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Succeeded | ItemState::Failed | ItemState::TimedOut
        )
    }
}

/// All mutable state of one run. Owned by whoever drives `update`; there are
/// no module-level globals, so concurrent or repeated runs cannot bleed into
/// each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    items: Vec<WorkItem>,
    item_states: Vec<ItemState>,
    ledger: StatusLedger,
    /// Live tab -> item index bindings; placeholder tab excluded.
    bindings: BTreeMap<TabId, usize>,
    options: RunOptions,
    /// `min(options.max_concurrent, items.len())`.
    max_in_flight: usize,
    phase: RunPhase,
    window_id: Option<WindowId>,
    placeholder_tab: Option<TabId>,
    next_unstarted: usize,
    open_tabs: usize,
    completed: usize,
    drained_slots: usize,
    aborted: bool,
}

impl RunState {
    /// Validate options and items and build the initial state. Rejects empty
    /// work lists here so callers can refuse a run before touching the host.
    pub fn new(options: RunOptions, items: Vec<WorkItem>) -> Result<Self, OptionsError> {
        options.validate()?;
        if items.is_empty() {
            return Err(OptionsError::NoWorkItems);
        }
        let max_in_flight = options.max_concurrent.min(items.len());
        let item_states = vec![ItemState::Unstarted; items.len()];
        Ok(Self {
            items,
            item_states,
            ledger: StatusLedger::new(),
            bindings: BTreeMap::new(),
            options,
            max_in_flight,
            phase: RunPhase::Idle,
            window_id: None,
            placeholder_tab: None,
            next_unstarted: 0,
            open_tabs: 0,
            completed: 0,
            drained_slots: 0,
            aborted: false,
        })
    }

    pub fn view(&self) -> RunView {
        let rows = self
            .ledger
            .iter()
            .map(|(index, entry)| ItemRowView {
                index,
                url: self.items[index].url.clone(),
                filename: self.items[index].filename.clone(),
                message: entry.message.clone(),
                is_final: entry.is_final,
                is_error: entry.is_error,
            })
            .collect();
        RunView {
            phase: self.phase,
            total: self.items.len(),
            completed: self.completed,
            aborted: self.aborted,
            rows,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.window_id
    }

    pub fn placeholder_tab(&self) -> Option<TabId> {
        self.placeholder_tab
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn open_tabs(&self) -> usize {
        self.open_tabs
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn ledger(&self) -> &StatusLedger {
        &self.ledger
    }

    pub fn item(&self, index: usize) -> &WorkItem {
        &self.items[index]
    }

    pub fn item_state(&self, index: usize) -> Option<&ItemState> {
        self.item_states.get(index)
    }

    pub fn index_for_tab(&self, tab: TabId) -> Option<usize> {
        self.bindings.get(&tab).copied()
    }

    /// Tabs currently bound to items, in ascending tab-id order.
    pub fn bound_tabs(&self) -> impl Iterator<Item = (TabId, usize)> + '_ {
        self.bindings.iter().map(|(t, i)| (*t, *i))
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_window(&mut self, window_id: WindowId) {
        self.window_id = Some(window_id);
    }

    pub(crate) fn set_placeholder_tab(&mut self, tab: TabId) {
        self.placeholder_tab = Some(tab);
    }

    pub(crate) fn take_next_unstarted(&mut self) -> Option<usize> {
        if self.next_unstarted < self.items.len() {
            let index = self.next_unstarted;
            self.next_unstarted += 1;
            Some(index)
        } else {
            None
        }
    }

    pub(crate) fn set_item_state(&mut self, index: usize, state: ItemState) {
        self.item_states[index] = state;
    }

    /// Move an item into a terminal state exactly once. Callers must check
    /// the current state first; completion counting depends on it.
    pub(crate) fn mark_terminal(&mut self, index: usize, state: ItemState) {
        debug_assert!(state.is_terminal());
        debug_assert!(!self.item_states[index].is_terminal());
        self.item_states[index] = state;
        self.completed += 1;
    }

    pub(crate) fn bind_tab(&mut self, index: usize, tab: TabId) {
        self.item_states[index] = ItemState::Loading { tab };
        self.bindings.insert(tab, index);
        self.open_tabs += 1;
    }

    pub(crate) fn unbind_tab(&mut self, tab: TabId) -> Option<usize> {
        let index = self.bindings.remove(&tab)?;
        self.open_tabs -= 1;
        Some(index)
    }

    /// Count one freed slot that found no work. Returns true when every slot
    /// has drained, i.e. the run is complete.
    pub(crate) fn drain_slot(&mut self) -> bool {
        self.drained_slots += 1;
        self.drained_slots == self.max_in_flight
    }

    pub(crate) fn abort(&mut self) {
        self.aborted = true;
    }

    pub(crate) fn ledger_set(
        &mut self,
        key: usize,
        message: impl Into<String>,
        is_final: bool,
        is_error: bool,
    ) -> Option<StatusEntry> {
        self.ledger.set(key, message, is_final, is_error)
    }
}
