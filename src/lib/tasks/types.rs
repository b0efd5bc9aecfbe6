use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Pending => "pending",
            State::Scheduled => "scheduled",
            State::Running => "running",
            State::Completed => "completed",
            State::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Restart policy handed to the container engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    None,
    Always,
    UnlessStopped,
    OnFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Set by the worker once the container has started.
    pub container_id: Option<String>,
    pub name: String,
    pub state: State,
    pub image: String,
    /// Memory limit in bytes, 0 for none.
    pub memory: u64,
    /// Declared disk in bytes. Informational only.
    pub disk: u64,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub exposed_ports: Vec<u16>,
    /// Container port (e.g. `"7777/tcp"`) to host port.
    #[serde(default)]
    pub port_bindings: HashMap<String, String>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Task {
            id: Uuid::new_v4(),
            container_id: None,
            name: name.into(),
            state: State::Pending,
            image: image.into(),
            memory: 0,
            disk: 0,
            env: Vec::new(),
            exposed_ports: Vec::new(),
            port_bindings: HashMap::new(),
            restart_policy: RestartPolicy::None,
            start_time: None,
            finish_time: None,
        }
    }
}

/// A request for a task to reach `state`, as of `timestamp`.
///
/// Events are immutable once built. The embedded snapshot always carries the
/// same state as the event itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    id: Uuid,
    state: State,
    timestamp: DateTime<Utc>,
    task: Task,
}

impl TaskEvent {
    pub fn new(state: State, mut task: Task) -> Self {
        task.state = state;
        TaskEvent {
            id: Uuid::new_v4(),
            state,
            timestamp: Utc::now(),
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_id(&self) -> Uuid {
        self.task.id
    }
}

/// Everything the container runtime needs to run a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub name: String,
    pub image: String,
    pub memory: Option<i64>,
    pub env: Vec<String>,
    pub exposed_ports: Vec<u16>,
    pub port_bindings: HashMap<String, String>,
    pub restart_policy: RestartPolicy,
}

impl From<&Task> for Config {
    fn from(task: &Task) -> Self {
        Config {
            name: task.name.clone(),
            image: task.image.clone(),
            memory: i64::try_from(task.memory).ok().filter(|m| *m > 0),
            env: task.env.clone(),
            exposed_ports: task.exposed_ports.clone(),
            port_bindings: task.port_bindings.clone(),
            restart_policy: task.restart_policy,
        }
    }
}
