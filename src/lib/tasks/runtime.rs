//! The container runtime capability used by the worker.

use async_trait::async_trait;

use super::types::Config;
use crate::error::RuntimeError;

/// Starts and stops containerised workloads.
///
/// Calls block until the runtime has finished and are never retried here.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pulls the image, creates and starts the container, then attaches to its
    /// output. Returns the container id.
    async fn start(&self, config: &Config) -> Result<String, RuntimeError>;

    /// Stops the container and removes it along with its volumes.
    async fn stop(&self, container_id: &str) -> Result<(), RuntimeError>;

    fn name(&self) -> &'static str;
}
