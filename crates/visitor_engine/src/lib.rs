//! Visitor engine: drives batch page visits against a live browser host.
mod controller;
mod errors;
mod handle;
mod host;
mod processor;
mod viewport;
mod watcher;

pub use controller::{run, NullObserver, RunObserver, VisitSettings};
pub use errors::{classify_host_error, SetupError};
pub use handle::{RunEvent, VisitorHandle};
pub use host::{
    Host, HostError, TabChange, TabEvent, TabSnapshot, TabStatus, WindowMetrics,
};
pub use processor::{PageHandle, PageProcessor, ProcessorError};
pub use viewport::{normalize, ViewportError};
pub use watcher::{TabWatcher, WatchSignal};
