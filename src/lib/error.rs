//! Error types for the worker.

use uuid::Uuid;

use crate::tasks::types::State;

/// A requested state change that the task state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: State,
    pub to: State,
}

/// Failures reported by a container runtime adapter.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to connect to container runtime: {0}")]
    Connect(String),

    #[error("failed to pull image {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("failed to create container from image {image}: {reason}")]
    ContainerCreate { image: String, reason: String },

    #[error("failed to start container {container_id}: {reason}")]
    ContainerStart { container_id: String, reason: String },

    #[error("failed to stop container {container_id}: {reason}")]
    ContainerStop { container_id: String, reason: String },

    #[error("container {container_id} was stopped but could not be removed: {reason}")]
    ContainerRemove { container_id: String, reason: String },

    #[error("no container id recorded")]
    MissingContainerId,
}

/// Task-level failures returned by one dispatch. None of these stop the worker.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("task {task_id} failed to start: {source}")]
    RuntimeStartFailure {
        task_id: Uuid,
        #[source]
        source: RuntimeError,
    },

    #[error("task {task_id} container cleanup failed: {source}")]
    RuntimeStopFailure {
        task_id: Uuid,
        #[source]
        source: RuntimeError,
    },

    #[error("no runtime action defined for {from} -> {to}")]
    InternalInvariantViolation { from: State, to: State },
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
