//! Applying one event to one ledger entry.
//!
//! [`transition`] decides the new ledger entry and the dispatch result for an
//! event without touching the ledger itself. The runtime is passed in, so it
//! can be driven by a substitute in tests.

use chrono::Utc;
use tracing::{info, warn};

use super::types::{Action, DispatchResult};
use crate::{
    error::{DispatchError, RuntimeError},
    tasks::{
        runtime::ContainerRuntime,
        state::validate_transition,
        types::{Config, State, Task, TaskEvent},
    },
};

/// Returns the entry to write back (`None` leaves the ledger as it is) and
/// the result to report.
///
/// A freshly seeded `entry` is validated like any other, so only a first
/// Scheduled event reaches the runtime.
pub async fn transition(
    entry: &Task,
    event: &TaskEvent,
    runtime: &dyn ContainerRuntime,
) -> (Option<Task>, DispatchResult) {
    let target = event.state();

    if let Err(err) = validate_transition(entry.state, target) {
        warn!(task_id = %entry.id, error = %err, "rejecting task event");
        return (
            None,
            DispatchResult::with_error(Action::None, entry.container_id.clone(), err.into()),
        );
    }

    match target {
        State::Scheduled => start_task(event.task().clone(), runtime).await,
        State::Completed => stop_task(entry.clone(), runtime).await,
        _ => {
            let err = DispatchError::InternalInvariantViolation {
                from: entry.state,
                to: target,
            };
            warn!(task_id = %entry.id, error = %err, "no handler for transition");
            (
                None,
                DispatchResult::with_error(Action::None, entry.container_id.clone(), err),
            )
        }
    }
}

async fn start_task(mut task: Task, runtime: &dyn ContainerRuntime) -> (Option<Task>, DispatchResult) {
    let config = Config::from(&task);

    match runtime.start(&config).await {
        Ok(container_id) => {
            info!(task_id = %task.id, %container_id, runtime = runtime.name(), "task running");
            task.state = State::Running;
            task.container_id = Some(container_id.clone());
            task.start_time = Some(Utc::now());
            let result = DispatchResult::success(
                Action::Start,
                Some(container_id),
                format!("task {} started", task.id),
            );
            (Some(task), result)
        }
        Err(source) => {
            warn!(task_id = %task.id, error = %source, "task failed to start");
            task.state = State::Failed;
            task.container_id = None;
            let err = DispatchError::RuntimeStartFailure {
                task_id: task.id,
                source,
            };
            (Some(task), DispatchResult::with_error(Action::Start, None, err))
        }
    }
}

/// Stop is best effort: the task is Completed whatever the runtime says.
async fn stop_task(mut task: Task, runtime: &dyn ContainerRuntime) -> (Option<Task>, DispatchResult) {
    let container_id = task.container_id.clone().filter(|id| !id.is_empty());

    let outcome = match &container_id {
        Some(id) => runtime.stop(id).await,
        None => Err(RuntimeError::MissingContainerId),
    };

    task.state = State::Completed;
    task.finish_time = Some(Utc::now());

    let result = match outcome {
        Ok(()) => {
            info!(task_id = %task.id, container_id = ?container_id, "task completed");
            DispatchResult::success(
                Action::Stop,
                container_id,
                format!("task {} completed", task.id),
            )
        }
        Err(source) => {
            warn!(task_id = %task.id, error = %source, "container cleanup failed, completing task anyway");
            let err = DispatchError::RuntimeStopFailure {
                task_id: task.id,
                source,
            };
            DispatchResult::with_error(Action::Stop, container_id, err)
        }
    };

    (Some(task), result)
}
