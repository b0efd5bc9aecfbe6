use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Serialize, Serializer};
use sysinfo::{Disks, System};
use tokio::sync::Mutex;
use tracing::info;

use super::ledger::LedgerReader;
use crate::tasks::types::Task;

/// What a worker reports about its host and its ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub hostname: String,
    pub cpus: usize,
    #[serde(serialize_with = "percent")]
    pub cpu_usage: f32,
    /// MiB.
    pub memory_used: u64,
    /// MiB.
    pub memory_total: u64,
    #[serde(serialize_with = "percent")]
    pub disk_usage: f32,
    pub task_count: usize,
    /// Ledger entries per task state, keyed by the state's display name.
    pub tasks_by_state: BTreeMap<String, usize>,
}

fn percent<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}%"))
}

fn usage_percent(used: f32, total: f32) -> f32 {
    if total > 0.0 { used / total * 100.0 } else { 0.0 }
}

fn disk_usage_percent(disks: &Disks) -> f32 {
    let (used, total) = disks.iter().fold((0.0f32, 0.0f32), |(used, total), disk| {
        let size = disk.total_space() as f32;
        (used + size - disk.available_space() as f32, total + size)
    });
    usage_percent(used, total)
}

fn count_by_state(tasks: &[Task]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        *counts.entry(task.state.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Builds stats from an already refreshed `System` and the ledger contents.
pub fn get_stats(sysinfo: &System, tasks: &[Task]) -> SystemStats {
    SystemStats {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        cpus: sysinfo.cpus().len(),
        cpu_usage: sysinfo.global_cpu_usage(),
        memory_used: sysinfo.used_memory() / 1024 / 1024,
        memory_total: sysinfo.total_memory() / 1024 / 1024,
        disk_usage: disk_usage_percent(&Disks::new_with_refreshed_list()),
        task_count: tasks.len(),
        tasks_by_state: count_by_state(tasks),
    }
}

/// Refreshes `sysinfo` and takes a snapshot of host and ledger.
pub async fn snapshot(sysinfo: &Mutex<System>, ledger: &LedgerReader) -> SystemStats {
    let tasks = ledger.tasks().await;
    let mut sysinfo = sysinfo.lock().await;
    sysinfo.refresh_all();
    get_stats(&sysinfo, &tasks)
}

/// Logs host statistics every `interval`.
pub async fn collect_stats(sysinfo: Arc<Mutex<System>>, ledger: LedgerReader, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let stats = snapshot(&sysinfo, &ledger).await;
        info!(
            cpu_usage = stats.cpu_usage,
            memory_used_mb = stats.memory_used,
            disk_usage = stats.disk_usage,
            task_count = stats.task_count,
            "host stats"
        );
    }
}
