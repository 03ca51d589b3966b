//! Visitor core: pure scheduling state machine for batch page visits.
mod effect;
mod failure;
mod item;
mod ledger;
mod msg;
mod options;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use failure::{FailureKind, PageOutcome};
pub use item::{filename_for_url, parse_work_items, WorkItem};
pub use ledger::{StatusEntry, StatusLedger};
pub use msg::Msg;
pub use options::{OptionsError, RunOptions};
pub use state::{ItemState, RunPhase, RunState, TabId, WindowId};
pub use update::update;
pub use view_model::{ItemRowView, RunView};
