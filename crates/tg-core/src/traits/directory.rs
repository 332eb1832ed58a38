//! Orchestrator directory trait

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::types::{Placement, ServiceInstance, WorkloadId};

/// Read-only view of the orchestrator's task, node and service records
#[async_trait]
pub trait Directory: Send + Sync {
    /// Current placement of a workload.
    ///
    /// Returns `DirectoryError::NotFound` when the workload is unknown.
    async fn placement(&self, workload: &WorkloadId) -> Result<Placement, DirectoryError>;

    /// Instances of a service with their network attachments, in the
    /// order the orchestrator reports them
    async fn service_instances(&self, service: &str)
        -> Result<Vec<ServiceInstance>, DirectoryError>;
}
