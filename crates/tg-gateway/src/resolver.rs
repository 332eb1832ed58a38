//! Workload to helper endpoint resolution
//!
//! Every session resolves afresh: where does the workload run right now,
//! and which helper on that node can be reached over the private network.
//! Nothing is cached, so a rescheduled workload is picked up on the next
//! session.

use std::sync::Arc;

use tg_core::config::GatewayConfig;
use tg_core::error::{DirectoryError, ResolveError};
use tg_core::traits::Directory;
use tg_core::{HelperEndpoint, NodeId, WorkloadId};

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Container currently running the workload
    pub container_id: String,
    /// Node it runs on
    pub node_id: NodeId,
    /// Helper to dial
    pub endpoint: HelperEndpoint,
}

/// Maps workload ids to the helper serving them
pub struct EndpointResolver {
    directory: Arc<dyn Directory>,
    helper_service: String,
    overlay_network: String,
    helper_port: u16,
}

impl EndpointResolver {
    /// Create a resolver from gateway configuration
    pub fn new(directory: Arc<dyn Directory>, config: &GatewayConfig) -> Self {
        Self {
            directory,
            helper_service: config.helper_service.clone(),
            overlay_network: config.overlay_network.clone(),
            helper_port: config.helper_port,
        }
    }

    /// Resolve a workload to its container and helper endpoint
    pub async fn resolve(&self, workload: &WorkloadId) -> Result<Resolution, ResolveError> {
        let placement = self
            .directory
            .placement(workload)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound(_) => ResolveError::NotFound(workload.clone()),
                other => ResolveError::Directory(other),
            })?;

        let container_id = placement
            .container_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ResolveError::NoPlacement(workload.clone()))?;

        let instances = self
            .directory
            .service_instances(&self.helper_service)
            .await
            .map_err(ResolveError::Directory)?;

        // First match in directory order wins
        let address = instances
            .iter()
            .filter(|inst| inst.is_running() && inst.node_id == placement.node_id)
            .find_map(|inst| inst.address_on(&self.overlay_network))
            .ok_or_else(|| ResolveError::NoHelper {
                service: self.helper_service.clone(),
                node: placement.node_id.clone(),
                network: self.overlay_network.clone(),
            })?;

        let endpoint = HelperEndpoint::new(address, self.helper_port);
        tracing::debug!(
            "Resolved {} to container {} on {} via helper {}",
            workload,
            container_id,
            placement.node_id,
            endpoint
        );

        Ok(Resolution {
            container_id,
            node_id: placement.node_id,
            endpoint,
        })
    }
}
