//! Read-only HTTP view of a worker: its ledger and host statistics.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use sysinfo::System;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::info;
use uuid::Uuid;

use super::{
    ledger::LedgerReader,
    stats::{SystemStats, snapshot},
};
use crate::tasks::types::Task;

#[derive(Clone)]
pub struct TaskServer {
    pub ledger: LedgerReader,
    pub sysinfo: Arc<Mutex<System>>,
    pub address: String,
    pub port: u16,
}

impl TaskServer {
    pub fn new(ledger: LedgerReader, sysinfo: Arc<Mutex<System>>, address: &str, port: u16) -> Self {
        Self {
            ledger,
            sysinfo,
            address: address.to_string(),
            port,
        }
    }

    async fn get_tasks(AxumState(server): AxumState<TaskServer>) -> Json<Vec<Task>> {
        Json(server.ledger.tasks().await)
    }

    async fn get_task(
        AxumState(server): AxumState<TaskServer>,
        Path(id): Path<Uuid>,
    ) -> Response {
        match server.ledger.get(&id).await {
            Some(task) => Json(task).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                format!("Task with id {} not found", id),
            )
                .into_response(),
        }
    }

    async fn get_stats(AxumState(server): AxumState<TaskServer>) -> Json<SystemStats> {
        Json(snapshot(&server.sysinfo, &server.ledger).await)
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/tasks", get(TaskServer::get_tasks))
            .route("/tasks/{id}", get(TaskServer::get_task))
            .route("/stats", get(TaskServer::get_stats))
            .with_state(self)
    }

    pub async fn start_server(self) -> std::io::Result<()> {
        let bind = format!("{}:{}", self.address, self.port);
        let listener = TcpListener::bind(&bind).await?;
        info!(address = %bind, "task server listening");

        axum::serve(listener, self.router()).await
    }
}
