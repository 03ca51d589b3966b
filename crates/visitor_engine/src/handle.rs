use std::sync::{mpsc, Arc};
use std::thread;

use visitor_core::{RunOptions, RunView, StatusEntry, WorkItem};

use crate::controller::{run, RunObserver, VisitSettings};
use crate::errors::SetupError;
use crate::host::Host;
use crate::processor::PageProcessor;

/// Events streamed to the caller while a run progresses.
#[derive(Debug)]
pub enum RunEvent {
    /// One accepted ledger write.
    Status { index: usize, entry: StatusEntry },
    /// The run is over; carries the final report. Always the last event.
    Finished(Result<RunView, SetupError>),
}

/// Thread-backed run for synchronous callers (a UI loop, say): the run
/// executes on its own tokio runtime and reports over a channel.
pub struct VisitorHandle {
    event_rx: mpsc::Receiver<RunEvent>,
}

struct ChannelObserver {
    tx: mpsc::Sender<RunEvent>,
}

impl RunObserver for ChannelObserver {
    fn status_changed(&self, index: usize, entry: &StatusEntry) {
        let _ = self.tx.send(RunEvent::Status {
            index,
            entry: entry.clone(),
        });
    }
}

impl VisitorHandle {
    pub fn start<H, P>(
        host: Arc<H>,
        processor: Arc<P>,
        settings: VisitSettings,
        options: RunOptions,
        items: Vec<WorkItem>,
    ) -> Self
    where
        H: Host + 'static,
        P: PageProcessor + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let observer = ChannelObserver {
                tx: event_tx.clone(),
            };
            let result = runtime.block_on(run(
                host,
                processor,
                &settings,
                options,
                items,
                &observer,
            ));
            let _ = event_tx.send(RunEvent::Finished(result));
        });
        Self { event_rx }
    }

    pub fn try_recv(&self) -> Option<RunEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event. `None` once the run thread is gone.
    pub fn recv(&self) -> Option<RunEvent> {
        self.event_rx.recv().ok()
    }
}
