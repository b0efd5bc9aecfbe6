use std::{fmt, sync::Arc};

use serde::Serialize;

use super::{
    ledger::TaskLedger,
    queue::{TaskQueue, TaskReceiver},
};
use crate::{error::DispatchError, tasks::runtime::ContainerRuntime};

/// Owns one task queue, one ledger and the runtime that serves them.
pub struct Worker {
    pub name: String,
    pub(crate) queue: TaskQueue,
    pub(crate) receiver: TaskReceiver,
    pub(crate) ledger: TaskLedger,
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
}

/// What a dispatch asked of the container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    Stop,
    None,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "start"),
            Action::Stop => write!(f, "stop"),
            Action::None => write!(f, "none"),
        }
    }
}

/// Outcome of handling one queued event.
#[derive(Debug)]
pub struct DispatchResult {
    pub error: Option<DispatchError>,
    pub action: Action,
    pub container_id: Option<String>,
    pub result: String,
}

impl DispatchResult {
    pub fn idle() -> Self {
        Self::noop("no tasks in queue")
    }

    pub fn noop(result: impl Into<String>) -> Self {
        DispatchResult {
            error: None,
            action: Action::None,
            container_id: None,
            result: result.into(),
        }
    }

    pub fn success(action: Action, container_id: Option<String>, result: impl Into<String>) -> Self {
        DispatchResult {
            error: None,
            action,
            container_id,
            result: result.into(),
        }
    }

    pub fn with_error(action: Action, container_id: Option<String>, err: DispatchError) -> Self {
        DispatchResult {
            result: err.to_string(),
            error: Some(err),
            action,
            container_id,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
