//! Swarm directory over the Docker Engine API
//!
//! Reads task records from a manager node: `GET /tasks/{id}` for a
//! workload's placement and `GET /tasks?filters=...` for the helper
//! service's instances. The engine is located like the docker CLI does it:
//! `DOCKER_HOST` when set, the local unix socket otherwise.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use hyperlocal::{UnixClientExt, UnixConnector, Uri as UnixUri};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::form_urlencoded;

use tg_core::error::DirectoryError;
use tg_core::traits::Directory;
use tg_core::{NetworkAttachment, NodeId, Placement, ServiceInstance, WorkloadId};
use tg_protocol::is_valid_identifier;

/// Engine socket used when `DOCKER_HOST` is unset
pub const DEFAULT_ENGINE_SOCKET: &str = "/var/run/docker.sock";

/// Where the Engine API is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineHost {
    /// Unix domain socket (`unix:///var/run/docker.sock`)
    Unix(PathBuf),
    /// Plain HTTP on `host:port` (`tcp://manager:2375`)
    Tcp(String),
}

impl EngineHost {
    /// `DOCKER_HOST`, or the default socket
    pub fn from_env() -> Result<Self, DirectoryError> {
        match std::env::var("DOCKER_HOST") {
            Ok(host) if !host.trim().is_empty() => host.parse(),
            _ => Ok(EngineHost::Unix(PathBuf::from(DEFAULT_ENGINE_SOCKET))),
        }
    }
}

impl FromStr for EngineHost {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            return Ok(EngineHost::Unix(PathBuf::from(path)));
        }
        if s.starts_with('/') {
            return Ok(EngineHost::Unix(PathBuf::from(s)));
        }

        s.strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|authority| !authority.is_empty() && !authority.contains('/'))
            .map(|authority| EngineHost::Tcp(authority.to_string()))
            .ok_or_else(|| DirectoryError::Unavailable(format!("unsupported engine host: {}", s)))
    }
}

impl fmt::Display for EngineHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineHost::Unix(path) => write!(f, "unix://{}", path.display()),
            EngineHost::Tcp(authority) => write!(f, "tcp://{}", authority),
        }
    }
}

#[derive(Clone)]
enum Transport {
    Unix(Client<UnixConnector, Full<Bytes>>),
    Tcp(Client<HttpConnector, Full<Bytes>>),
}

/// Directory backed by a swarm manager's Engine API
#[derive(Clone)]
pub struct DockerDirectory {
    host: EngineHost,
    transport: Transport,
}

impl DockerDirectory {
    /// Create a directory talking to `host`
    pub fn new(host: EngineHost) -> Self {
        let transport = match &host {
            EngineHost::Unix(_) => Transport::Unix(Client::unix()),
            EngineHost::Tcp(_) => {
                Transport::Tcp(Client::builder(TokioExecutor::new()).build_http())
            }
        };
        Self { host, transport }
    }

    /// Connect to `host`, or to `DOCKER_HOST` / the local socket when `None`
    pub fn connect(host: Option<&str>) -> Result<Self, DirectoryError> {
        let host = match host {
            Some(host) => host.parse()?,
            None => EngineHost::from_env()?,
        };
        Ok(Self::new(host))
    }

    /// Engine endpoint in use
    pub fn host(&self) -> &EngineHost {
        &self.host
    }

    fn uri(&self, path_and_query: &str) -> Result<Uri, DirectoryError> {
        match &self.host {
            EngineHost::Unix(socket) => Ok(UnixUri::new(socket, path_and_query).into()),
            EngineHost::Tcp(authority) => format!("http://{}{}", authority, path_and_query)
                .parse()
                .map_err(|e| DirectoryError::Unavailable(format!("engine uri: {}", e))),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
        what: &str,
    ) -> Result<T, DirectoryError> {
        let unavailable =
            |e: &dyn fmt::Display| DirectoryError::Unavailable(format!("{}: {}", what, e));

        let request = Request::get(self.uri(path_and_query)?)
            .body(Full::new(Bytes::new()))
            .map_err(|e| unavailable(&e))?;

        let response = match &self.transport {
            Transport::Unix(client) => client.request(request).await,
            Transport::Tcp(client) => client.request(request).await,
        }
        .map_err(|e| unavailable(&e))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| unavailable(&e))?
            .to_bytes();

        match status {
            status if status.is_success() => {
                serde_json::from_slice(&body).map_err(|e| unavailable(&e))
            }
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(what.to_string())),
            status => Err(DirectoryError::Unavailable(format!(
                "{}: {} {}",
                what,
                status,
                api_message(&String::from_utf8_lossy(&body))
            ))),
        }
    }
}

/// `message` field of an Engine API error body, or the raw body
fn api_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Task {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "ServiceID", default)]
    service_id: String,
    /// Absent until the scheduler assigns the task
    #[serde(rename = "NodeID", default)]
    node_id: Option<String>,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    networks_attachments: Vec<TaskNetworkAttachment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskStatus {
    #[serde(default)]
    state: String,
    container_status: Option<ContainerStatus>,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    #[serde(rename = "ContainerID")]
    container_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskNetworkAttachment {
    network: TaskNetwork,
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskNetwork {
    spec: NetworkSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkSpec {
    #[serde(default)]
    name: String,
}

impl Task {
    fn node(&self) -> Option<&str> {
        self.node_id.as_deref().filter(|id| !id.is_empty())
    }

    /// A container only counts once the task is bound to a node
    fn placement(self) -> Placement {
        let container_id = if self.node().is_some() {
            self.status
                .container_status
                .and_then(|s| s.container_id)
                .filter(|id| !id.is_empty())
        } else {
            None
        };

        Placement {
            node_id: NodeId::new(self.node_id.unwrap_or_default()),
            container_id,
            service_id: self.service_id,
        }
    }

    fn instance(self) -> ServiceInstance {
        ServiceInstance {
            node_id: NodeId::new(self.node_id.unwrap_or_default()),
            state: self.status.state,
            attachments: self
                .networks_attachments
                .into_iter()
                .map(|a| NetworkAttachment {
                    network: a.network.spec.name,
                    addresses: a.addresses,
                })
                .collect(),
        }
    }
}

/// Path and query listing the tasks of one service
fn service_tasks_path(service: &str) -> String {
    let filters = serde_json::json!({ "service": [service] }).to_string();
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("filters", &filters)
        .finish();
    format!("/tasks?{}", query)
}

#[async_trait]
impl Directory for DockerDirectory {
    async fn placement(&self, workload: &WorkloadId) -> Result<Placement, DirectoryError> {
        let what = format!("task {}", workload);
        if !is_valid_identifier(workload.as_str()) {
            return Err(DirectoryError::NotFound(what));
        }

        let task: Task = self
            .get_json(&format!("/tasks/{}", workload), &what)
            .await?;

        // The engine also resolves unique id prefixes
        if !task.id.starts_with(workload.as_str()) {
            return Err(DirectoryError::Unavailable(format!(
                "{}: engine answered with task {}",
                what, task.id
            )));
        }
        Ok(task.placement())
    }

    async fn service_instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError> {
        let tasks: Vec<Task> = self
            .get_json(
                &service_tasks_path(service),
                &format!("tasks of service {}", service),
            )
            .await?;
        Ok(tasks.into_iter().map(Task::instance).collect())
    }
}
