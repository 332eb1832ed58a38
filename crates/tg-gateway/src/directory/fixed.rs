//! In-memory directory with a fixed view of the cluster

use std::collections::HashMap;

use async_trait::async_trait;

use tg_core::error::DirectoryError;
use tg_core::traits::Directory;
use tg_core::{Placement, ServiceInstance, WorkloadId};

/// Directory answering from a fixed set of placements and instances.
///
/// Unknown workloads are `NotFound`; unknown services have no instances.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    placements: HashMap<String, Placement>,
    services: HashMap<String, Result<Vec<ServiceInstance>, String>>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workload placement
    pub fn with_placement(mut self, workload: impl Into<String>, placement: Placement) -> Self {
        self.placements.insert(workload.into(), placement);
        self
    }

    /// Set the instances of a service, in listing order
    pub fn with_instances(
        mut self,
        service: impl Into<String>,
        instances: Vec<ServiceInstance>,
    ) -> Self {
        self.services.insert(service.into(), Ok(instances));
        self
    }

    /// Make listing a service fail
    pub fn unavailable(mut self, service: impl Into<String>, cause: impl Into<String>) -> Self {
        self.services.insert(service.into(), Err(cause.into()));
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn placement(&self, workload: &WorkloadId) -> Result<Placement, DirectoryError> {
        self.placements
            .get(workload.as_str())
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(workload.to_string()))
    }

    async fn service_instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError> {
        match self.services.get(service) {
            Some(Ok(instances)) => Ok(instances.clone()),
            Some(Err(cause)) => Err(DirectoryError::Unavailable(cause.clone())),
            None => Ok(Vec::new()),
        }
    }
}
