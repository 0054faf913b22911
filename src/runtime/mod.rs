//! Read-only client for the container runtime's control socket.
//!
//! The runtime is treated as an opaque local service speaking the Docker
//! Engine HTTP API over a unix socket. Every call is idempotent, carries a
//! mandatory timeout, and maps transport or protocol failures onto the typed
//! [`Error`] taxonomy. Nothing in this module mutates runtime state.

use async_trait::async_trait;

use crate::container::{ContainerID, ContainerRef};
use crate::metrics::{FileMetric, ResourceMetric};

mod docker;
mod error;
pub mod payload;

pub use docker::DockerClient;
pub use error::{Error, ErrorKind, Result};

/// Query surface of the container runtime.
///
/// The collection engine only talks to the runtime through this trait so the
/// reconciliation logic can be exercised against a scripted fake.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Enumerates the currently running containers.
    async fn list_containers(&self) -> Result<Vec<ContainerRef>>;

    /// Fetches the per-mount file metrics for one container.
    async fn fetch_file_metrics(&self, id: &ContainerID) -> Result<Vec<FileMetric>>;

    /// Fetches the resource metrics for one container.
    async fn fetch_resource_metrics(&self, id: &ContainerID) -> Result<ResourceMetric>;
}
