use std::{sync::Arc, time::Duration};

use anyhow::Context;
use r_cube_worker::{
    config::WorkerConfig,
    tasks::{
        docker::DockerClient,
        types::{State, Task, TaskEvent},
    },
    worker::{
        api::TaskServer,
        queue::TaskQueue,
        stats::collect_stats,
        types::Worker,
        worker::run_tasks,
    },
};
use sysinfo::System;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env().context("loading worker configuration")?;
    let docker = DockerClient::connect().context("connecting to docker")?;

    let worker = Worker::new(&config.name, Arc::new(docker));
    let queue = worker.queue();
    let ledger = worker.ledger();
    let sysinfo = Arc::new(Mutex::new(System::new_all()));
    let server = TaskServer::new(ledger.clone(), sysinfo.clone(), &config.address, config.port);

    tokio::spawn(run_tasks(worker, config.dispatch_interval));
    tokio::spawn(collect_stats(sysinfo, ledger, config.stats_interval));

    if config.demo_task {
        tokio::spawn(submit_demo_task(queue));
    }

    tokio::select! {
        served = server.start_server() => served.context("running task server")?,
        _ = tokio::signal::ctrl_c() => info!(worker = %config.name, "shutting down"),
    }

    Ok(())
}

async fn submit_demo_task(queue: TaskQueue) {
    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut task = Task::new("helloworld", "strm/helloworld-http");
    task.exposed_ports = vec![80];
    info!(task_id = %task.id, "submitting demo task");
    queue.enqueue(TaskEvent::new(State::Scheduled, task.clone()));

    tokio::time::sleep(Duration::from_secs(30)).await;
    queue.enqueue(TaskEvent::new(State::Completed, task));
}
