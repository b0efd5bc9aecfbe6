//! FIFO intake of task events: any number of producers, exactly one consumer.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::debug;

use crate::tasks::types::TaskEvent;

/// Producer handle. Cheap to clone; every clone feeds the same worker.
#[derive(Debug, Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

/// Consumer end, owned by the worker's dispatch loop.
#[derive(Debug)]
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

pub fn channel() -> (TaskQueue, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskQueue { tx }, TaskReceiver { rx })
}

impl TaskQueue {
    /// Fire-and-forget. Returns `false` once the worker has gone away.
    pub fn enqueue(&self, event: TaskEvent) -> bool {
        let task_id = event.task_id();
        match self.tx.send(event) {
            Ok(()) => {
                debug!(%task_id, "task event queued");
                true
            }
            Err(_) => false,
        }
    }
}

impl TaskReceiver {
    /// Next event in arrival order, or `None` when nothing is waiting.
    /// Never blocks.
    pub fn dequeue(&mut self) -> Option<TaskEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
