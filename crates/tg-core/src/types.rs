//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a schedulable unit (a swarm task id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadId(pub String);

impl WorkloadId {
    /// Create a new workload ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkloadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a cluster node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a workload currently runs.
///
/// Fetched fresh for every session; `container_id` is only set while the
/// workload's process is alive on `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub node_id: NodeId,
    pub container_id: Option<String>,
    pub service_id: String,
}

/// One network a service instance is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    /// Network name, e.g. `agent-net`
    pub network: String,
    /// Addresses on that network, usually in CIDR form (`10.0.0.5/24`)
    pub addresses: Vec<String>,
}

/// One instance (task) of a service as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub node_id: NodeId,
    /// Observed state as reported by the orchestrator (`running`, `failed`, ...)
    pub state: String,
    pub attachments: Vec<NetworkAttachment>,
}

impl ServiceInstance {
    /// Whether the instance is currently running
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    /// First usable address on the named network
    pub fn address_on(&self, network: &str) -> Option<IpAddr> {
        self.attachments
            .iter()
            .filter(|a| a.network == network)
            .flat_map(|a| a.addresses.iter())
            .find_map(|addr| parse_host(addr))
    }
}

/// Host part of `10.0.0.5/24` or `10.0.0.5`
fn parse_host(address: &str) -> Option<IpAddr> {
    address.split('/').next()?.trim().parse().ok()
}

/// Reachable helper address on the private network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperEndpoint {
    pub address: IpAddr,
    pub port: u16,
}

impl HelperEndpoint {
    /// Create a new endpoint
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }

    /// Socket address form
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl fmt::Display for HelperEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Header carrying the correlation id from gateway to helper
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Per-session correlation id shared by both hops' logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}
