use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use super::{
    dispatch::transition,
    ledger::{LedgerReader, TaskLedger},
    queue::{self, TaskQueue},
    types::{DispatchResult, Worker},
};
use crate::tasks::{runtime::ContainerRuntime, types::TaskEvent};

impl Worker {
    pub fn new(name: &str, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let (queue, receiver) = queue::channel();
        Worker {
            name: name.to_string(),
            queue,
            receiver,
            ledger: TaskLedger::new(),
            runtime,
        }
    }

    /// Handles one queued event to completion.
    pub async fn run_task(&mut self) -> DispatchResult {
        let Some(event) = self.receiver.dequeue() else {
            debug!(worker = %self.name, "no tasks in queue");
            return DispatchResult::idle();
        };

        let (entry, seeded) = self.ledger.get_or_seed(event.task()).await;
        if seeded {
            debug!(worker = %self.name, task_id = %entry.id, state = %entry.state, "task seeded");
        }
        let (update, result) = transition(&entry, &event, self.runtime.as_ref()).await;

        if let Some(task) = update {
            self.ledger.put(task).await;
        }

        match &result.error {
            Some(err) => warn!(
                worker = %self.name,
                task_id = %event.task_id(),
                action = %result.action,
                error = %err,
                "dispatch failed"
            ),
            None => info!(
                worker = %self.name,
                task_id = %event.task_id(),
                action = %result.action,
                "{}",
                result.result
            ),
        }

        result
    }

    pub fn add_task(&self, event: TaskEvent) -> bool {
        self.queue.enqueue(event)
    }

    /// Producer handle for this worker's queue.
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    pub fn ledger(&self) -> LedgerReader {
        self.ledger.reader()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Dispatches queued events forever, sleeping for `idle` whenever the queue
/// is empty.
pub async fn run_tasks(mut worker: Worker, idle: Duration) {
    info!(worker = %worker.name, runtime = worker.runtime.name(), "dispatch loop started");
    loop {
        if worker.pending() > 0 {
            worker.run_task().await;
        } else {
            tokio::time::sleep(idle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DispatchError,
        tasks::types::{State, Task},
        worker::{
            dispatch::tests::{Call, FakeRuntime},
            types::Action,
        },
    };

    fn worker(runtime: Arc<FakeRuntime>) -> Worker {
        Worker::new("test-worker", runtime)
    }

    #[tokio::test]
    async fn empty_queue_is_a_noop() {
        let mut worker = worker(Arc::new(FakeRuntime::default()));
        let result = worker.run_task().await;

        assert!(result.is_ok());
        assert_eq!(result.action, Action::None);
        assert!(worker.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn first_sight_is_seeded_then_validated() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());

        for state in [State::Pending, State::Completed, State::Failed] {
            let event = TaskEvent::new(state, Task::new("web", "strm/helloworld-http"));
            worker.add_task(event.clone());

            let result = worker.run_task().await;

            assert_eq!(result.action, Action::None);
            assert!(
                matches!(
                    result.error,
                    Some(DispatchError::InvalidTransition(err)) if err.from == state && err.to == state
                ),
                "{state}"
            );
            assert_eq!(
                worker.ledger().get(&event.task_id()).await.as_ref(),
                Some(event.task())
            );
        }

        assert_eq!(worker.ledger().len().await, 3);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn scheduled_to_failed_leaves_ledger_untouched() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());
        let mut task = Task::new("web", "strm/helloworld-http");
        task.state = State::Scheduled;
        worker.ledger.put(task.clone()).await;

        worker.add_task(TaskEvent::new(State::Failed, task.clone()));
        let result = worker.run_task().await;

        assert!(matches!(
            result.error,
            Some(DispatchError::InternalInvariantViolation {
                from: State::Scheduled,
                to: State::Failed
            })
        ));
        assert_eq!(worker.ledger().get(&task.id).await, Some(task));
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn running_self_loop_after_start_is_rejected() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());
        let task = Task::new("web", "strm/helloworld-http");
        worker.add_task(TaskEvent::new(State::Scheduled, task.clone()));
        worker.add_task(TaskEvent::new(State::Running, task.clone()));

        assert!(worker.run_task().await.is_ok());
        let before = worker.ledger().get(&task.id).await;
        let result = worker.run_task().await;

        assert!(matches!(
            result.error,
            Some(DispatchError::InternalInvariantViolation {
                from: State::Running,
                to: State::Running
            })
        ));
        assert_eq!(worker.ledger().get(&task.id).await, before);
        assert_eq!(runtime.calls().len(), 1);
    }

    #[tokio::test]
    async fn scheduled_then_completed_stops_same_container() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());
        let task = Task::new("web", "strm/helloworld-http");
        worker.add_task(TaskEvent::new(State::Scheduled, task.clone()));
        worker.add_task(TaskEvent::new(State::Completed, task.clone()));

        let started = worker.run_task().await;
        assert!(started.is_ok());
        let entry = worker.ledger().get(&task.id).await.unwrap();
        assert_eq!(entry.state, State::Running);
        let container_id = entry.container_id.clone().unwrap();
        assert!(!container_id.is_empty());

        let stopped = worker.run_task().await;
        assert!(stopped.is_ok());
        let entry = worker.ledger().get(&task.id).await.unwrap();
        assert_eq!(entry.state, State::Completed);
        assert_eq!(entry.container_id.as_deref(), Some(container_id.as_str()));

        assert_eq!(
            runtime.calls(),
            vec![
                Call::Start("strm/helloworld-http".to_string()),
                Call::Stop(container_id)
            ]
        );
    }

    #[tokio::test]
    async fn running_bootstrap_then_completed_reports_stop_failure() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());
        let task = Task::new("web", "strm/helloworld-http");
        worker.add_task(TaskEvent::new(State::Running, task.clone()));
        worker.add_task(TaskEvent::new(State::Completed, task.clone()));

        let seeded = worker.run_task().await;
        assert!(matches!(
            seeded.error,
            Some(DispatchError::InternalInvariantViolation {
                from: State::Running,
                to: State::Running
            })
        ));
        assert_eq!(
            worker.ledger().get(&task.id).await.unwrap().state,
            State::Running
        );

        let result = worker.run_task().await;
        assert!(matches!(
            result.error,
            Some(DispatchError::RuntimeStopFailure { .. })
        ));
        assert_eq!(
            worker.ledger().get(&task.id).await.unwrap().state,
            State::Completed
        );
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn replayed_terminal_event_is_rejected() {
        let runtime = Arc::new(FakeRuntime::default());
        let mut worker = worker(runtime.clone());
        let task = Task::new("web", "strm/helloworld-http");
        let completed = TaskEvent::new(State::Completed, task.clone());
        worker.add_task(TaskEvent::new(State::Scheduled, task.clone()));
        worker.add_task(completed.clone());
        worker.add_task(completed);

        worker.run_task().await;
        worker.run_task().await;
        let before = worker.ledger().get(&task.id).await;
        let result = worker.run_task().await;

        assert!(matches!(
            result.error,
            Some(DispatchError::InvalidTransition(_))
        ));
        assert_eq!(worker.ledger().get(&task.id).await, before);
        assert_eq!(runtime.calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_start_is_recorded() {
        let runtime = Arc::new(FakeRuntime {
            fail_start: true,
            ..Default::default()
        });
        let mut worker = worker(runtime);
        let mut task = Task::new("web", "missing/image");
        task.container_id = Some("stale".to_string());
        worker.add_task(TaskEvent::new(State::Scheduled, task.clone()));

        let result = worker.run_task().await;

        assert!(!result.is_ok());
        let entry = worker.ledger().get(&task.id).await.unwrap();
        assert_eq!(entry.state, State::Failed);
        assert_eq!(entry.container_id, None);
    }
}
