//! The worker's record of the last known state of every task it has seen.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::tasks::types::Task;

type Entries = Arc<RwLock<HashMap<Uuid, Task>>>;

/// Write side of the ledger. Only the worker that owns it holds one.
#[derive(Debug, Default)]
pub struct TaskLedger {
    entries: Entries,
}

/// Read-only view of a ledger for monitoring.
#[derive(Debug, Clone)]
pub struct LedgerReader {
    entries: Entries,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> LedgerReader {
        LedgerReader {
            entries: self.entries.clone(),
        }
    }

    pub async fn get(&self, id: &Uuid) -> Option<Task> {
        self.entries.read().await.get(id).cloned()
    }

    /// Returns the entry for `task.id`, inserting `task` verbatim if there is
    /// none. The flag is `true` when this call created the entry.
    pub(crate) async fn get_or_seed(&self, task: &Task) -> (Task, bool) {
        let mut entries = self.entries.write().await;
        match entries.get(&task.id) {
            Some(existing) => (existing.clone(), false),
            None => {
                entries.insert(task.id, task.clone());
                (task.clone(), true)
            }
        }
    }

    pub(crate) async fn put(&self, task: Task) {
        self.entries.write().await.insert(task.id, task);
    }
}

impl LedgerReader {
    pub async fn get(&self, id: &Uuid) -> Option<Task> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
