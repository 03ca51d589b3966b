use crate::state::ItemState;
use crate::{Effect, FailureKind, Msg, PageOutcome, RunPhase, RunState};

/// Pure dispatch function: applies a message to the run state and returns
/// the effects the driver must execute.
///
/// Work items are admitted in strict input order. A freed slot (tab closed
/// or tab creation refused) immediately admits the next unstarted item; once
/// no unstarted items remain, each freed slot drains, and the run finishes
/// when every slot has drained. Stale messages (a deadline for an item that
/// already finished, an outcome for a tab that already timed out) fall
/// through without effect.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::RunRequested => {
            if state.phase() != RunPhase::Idle {
                return (state, Vec::new());
            }
            state.set_phase(RunPhase::WindowOpening);
            vec![Effect::OpenWindow]
        }
        Msg::WindowCreated { window_id } => {
            if state.phase() == RunPhase::WindowOpening {
                state.set_window(window_id);
                state.set_phase(RunPhase::Sizing);
            }
            Vec::new()
        }
        Msg::PlaceholderReady { tab_id } => {
            // The host fires several update events on the placeholder
            // document; only the first one matters.
            if state.phase() != RunPhase::Sizing || state.placeholder_tab().is_some() {
                return (state, Vec::new());
            }
            let Some(window_id) = state.window_id() else {
                return (state, Vec::new());
            };
            state.set_placeholder_tab(tab_id);
            vec![Effect::MeasureAndResize {
                window_id,
                probe_tab: tab_id,
                width: state.options().viewport_width,
                height: state.options().viewport_height,
            }]
        }
        Msg::ViewportNormalized => {
            if state.phase() != RunPhase::Sizing {
                return (state, Vec::new());
            }
            state.set_phase(RunPhase::Visiting);
            let mut effects = Vec::new();
            for _ in 0..state.max_in_flight() {
                admit_next(&mut state, &mut effects);
            }
            effects
        }
        Msg::TabOpened { index, tab_id } => {
            if state.item_state(index) == Some(&ItemState::Opening) && !state.is_aborted() {
                state.bind_tab(index, tab_id);
                Vec::new()
            } else {
                // Admission raced with an abort; the tab is orphaned.
                vec![Effect::CloseTab { tab_id }]
            }
        }
        Msg::TabOpenFailed { index, message } => {
            let mut effects = Vec::new();
            if state.item_state(index) == Some(&ItemState::Opening) {
                state.mark_terminal(index, ItemState::Failed);
                set_status(
                    &mut state,
                    &mut effects,
                    index,
                    FailureKind::TabOpenFailed(message).to_string(),
                    true,
                    true,
                );
                // No tab ever existed for this slot, so it frees right away.
                admit_next(&mut state, &mut effects);
            }
            effects
        }
        Msg::PageReady { tab_id } => {
            let mut effects = Vec::new();
            if let Some(index) = state.index_for_tab(tab_id) {
                if matches!(state.item_state(index), Some(ItemState::Loading { .. })) {
                    state.set_item_state(index, ItemState::Processing { tab: tab_id });
                    set_status(&mut state, &mut effects, index, "processing", false, false);
                    effects.push(Effect::BeginProcessing { tab_id, index });
                }
            }
            effects
        }
        Msg::DeadlineExpired { tab_id } => {
            // Relevant only while the page is still loading; once processing
            // starts, the per-page task enforces the remaining deadline.
            let mut effects = Vec::new();
            if let Some(index) = state.index_for_tab(tab_id) {
                if matches!(state.item_state(index), Some(ItemState::Loading { .. })) {
                    state.mark_terminal(index, ItemState::TimedOut);
                    let message = timeout_message(&state);
                    set_status(&mut state, &mut effects, index, message, true, true);
                    effects.push(Effect::CloseTab { tab_id });
                }
            }
            effects
        }
        Msg::PageFinished { tab_id, outcome } => {
            let Some(index) = state.index_for_tab(tab_id) else {
                return (state, Vec::new());
            };
            if !matches!(state.item_state(index), Some(ItemState::Processing { .. })) {
                // Stale: the item timed out or the run aborted meanwhile.
                return (state, Vec::new());
            }
            let mut effects = Vec::new();
            match outcome {
                PageOutcome::Succeeded { summary } => {
                    state.mark_terminal(index, ItemState::Succeeded);
                    let message = summary.unwrap_or_else(|| "done".to_string());
                    set_status(&mut state, &mut effects, index, message, true, false);
                }
                PageOutcome::TimedOut => {
                    state.mark_terminal(index, ItemState::TimedOut);
                    let message = timeout_message(&state);
                    set_status(&mut state, &mut effects, index, message, true, true);
                }
                PageOutcome::Failed { kind, fatal } => {
                    state.mark_terminal(index, ItemState::Failed);
                    set_status(
                        &mut state,
                        &mut effects,
                        index,
                        format!("failed: {kind}"),
                        true,
                        true,
                    );
                    if fatal {
                        abort_run(&mut state, &mut effects, tab_id);
                    }
                }
            }
            effects.push(Effect::CloseTab { tab_id });
            effects
        }
        Msg::TabClosed { tab_id } => {
            let mut effects = Vec::new();
            if state.unbind_tab(tab_id).is_some() {
                if state.is_aborted() {
                    if state.open_tabs() == 0 {
                        finish(&mut state, &mut effects);
                    }
                } else {
                    admit_next(&mut state, &mut effects);
                }
            }
            effects
        }
    };
    (state, effects)
}

/// Fill one freed concurrency slot: open the next unstarted item's tab, or
/// drain the slot and finish the run once all slots have drained.
fn admit_next(state: &mut RunState, effects: &mut Vec<Effect>) {
    if state.phase() != RunPhase::Visiting || state.is_aborted() {
        return;
    }
    let Some(window_id) = state.window_id() else {
        return;
    };
    match state.take_next_unstarted() {
        Some(index) => {
            state.set_item_state(index, ItemState::Opening);
            set_status(state, effects, index, "loading", false, false);
            effects.push(Effect::OpenTab {
                window_id,
                index,
                url: state.item(index).url.clone(),
            });
        }
        None => {
            if state.drain_slot() {
                finish(state, effects);
            }
        }
    }
}

/// Stop admitting, resolve every unresolved item as failed, and tear down
/// all other live tabs. The run finishes once the last teardown confirms.
fn abort_run(state: &mut RunState, effects: &mut Vec<Effect>, finishing_tab: crate::TabId) {
    state.abort();
    for index in 0..state.total() {
        let unresolved = matches!(
            state.item_state(index),
            Some(ItemState::Unstarted | ItemState::Opening)
        );
        if unresolved {
            state.mark_terminal(index, ItemState::Failed);
            set_status(
                state,
                effects,
                index,
                "not visited: run aborted",
                true,
                true,
            );
        }
    }
    let live: Vec<_> = state
        .bound_tabs()
        .filter(|(tab, _)| *tab != finishing_tab)
        .collect();
    for (tab, index) in live {
        if !state.item_state(index).is_some_and(ItemState::is_terminal) {
            state.mark_terminal(index, ItemState::Failed);
            set_status(state, effects, index, "run aborted", true, true);
        }
        effects.push(Effect::CloseTab { tab_id: tab });
    }
}

fn finish(state: &mut RunState, effects: &mut Vec<Effect>) {
    state.set_phase(RunPhase::Done);
    if let Some(window_id) = state.window_id() {
        effects.push(Effect::CloseWindow { window_id });
    }
    effects.push(Effect::RunFinished {
        aborted: state.is_aborted(),
    });
}

fn set_status(
    state: &mut RunState,
    effects: &mut Vec<Effect>,
    index: usize,
    message: impl Into<String>,
    is_final: bool,
    is_error: bool,
) {
    if let Some(entry) = state.ledger_set(index, message, is_final, is_error) {
        effects.push(Effect::StatusChanged { index, entry });
    }
}

fn timeout_message(state: &RunState) -> String {
    format!(
        "timed out after {}s",
        state.options().timeout.as_secs_f64()
    )
}
