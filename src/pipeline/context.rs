//! Pipeline context: typed hand-off queues, completion groups, and the per-unit channel bundle.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::{Transformed, WorkItem};

/// Files the enumerator could not turn into work items: (path, reason).
pub type SkippedFiles = Arc<Mutex<Vec<(PathBuf, String)>>>;

/// Bounded multi-producer/multi-consumer queue that moves ownership of one item per hand-off.
/// A full queue blocks its producers; dropping every sender closes it for the consumers.
pub struct HandOff<T> {
    pub tx: Sender<T>,
    pub rx: Receiver<T>,
}

impl<T> HandOff<T> {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded::<T>(capacity);
        Self { tx, rx }
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    pub fn split(self) -> (Sender<T>, Receiver<T>) {
        (self.tx, self.rx)
    }
}

/// Completion barrier for a group of threads (wait-group).
///
/// Every member holds a clone of the sender and drops it on exit; the receiver
/// disconnects once the last member is gone. Nothing is ever sent on it.
pub fn completion_group() -> (Sender<()>, Receiver<()>) {
    bounded::<()>(0)
}

/// Channels and shared state for one unit of work. The enumerator gets `work.tx`;
/// workers get `work.rx` and `results.tx`; the sink gets `results.rx`.
pub struct PipelineChannels {
    pub work: HandOff<WorkItem>,
    pub results: HandOff<Transformed>,
    pub skipped: SkippedFiles,
}

/// Both queues hold at most `concurrency` items, which bounds in-flight decoded images and
/// encoded buffers to O(concurrency).
pub fn create_pipeline_channels(concurrency: usize) -> PipelineChannels {
    let capacity = concurrency.max(1);
    PipelineChannels {
        work: HandOff::bounded(capacity),
        results: HandOff::bounded(capacity),
        skipped: Arc::new(Mutex::new(Vec::new())),
    }
}
