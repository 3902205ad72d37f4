//! Container platform abstraction.
//!
//! The engine talks to a container platform only through the `ContainerPlatform`
//! trait:
//! - `DockerPlatform`: Docker Engine API (via bollard)
//! - `GuardedPlatform`: wraps any platform with per-call deadlines and retries

use crate::error::PlatformError;
use crate::types::{PortMapping, Protocol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::SystemTime;

pub mod docker;
pub mod guarded;

pub use docker::DockerPlatform;
pub use guarded::GuardedPlatform;

/// Result type for platform calls.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Container platform trait.
///
/// Implementations report "already exists" as [`PlatformError::Conflict`] and
/// "already stopped" as [`PlatformError::NotModified`]; the engine decides where
/// those count as success.
#[async_trait]
pub trait ContainerPlatform: Send + Sync {
    /// List containers. With `all = false` only running containers are returned.
    async fn list_containers(&self, all: bool) -> PlatformResult<Vec<ContainerSummary>>;

    /// Create a container and return its ID. Does not start it.
    async fn create_container(&self, spec: &ContainerSpec) -> PlatformResult<String>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> PlatformResult<()>;

    /// Stop a running container.
    async fn stop_container(&self, id: &str) -> PlatformResult<()>;

    /// Remove a container. It should be stopped first.
    async fn remove_container(&self, id: &str) -> PlatformResult<()>;

    /// Give a container a new name. Fails with `Conflict` if the name is taken.
    async fn rename_container(&self, id: &str, name: &str) -> PlatformResult<()>;

    /// Fetch the current view of one container.
    async fn inspect_container(&self, id: &str) -> PlatformResult<ContainerSummary>;

    /// Create a network.
    async fn create_network(&self, spec: &NetworkCreate) -> PlatformResult<()>;

    /// List all networks.
    async fn list_networks(&self) -> PlatformResult<Vec<NetworkSummary>>;

    /// Remove a network by name.
    async fn remove_network(&self, name: &str) -> PlatformResult<()>;

    /// Create a volume.
    async fn create_volume(&self, spec: &VolumeCreate) -> PlatformResult<()>;

    /// List all volumes.
    async fn list_volumes(&self) -> PlatformResult<Vec<VolumeSummary>>;

    /// Remove a volume by name.
    async fn remove_volume(&self, name: &str) -> PlatformResult<()>;

    /// Platform name (for logging).
    fn name(&self) -> &str;
}

/// Everything needed to create one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,

    /// Image reference
    pub image: String,

    /// `KEY=value` entries
    pub env: Vec<String>,

    /// Command override
    pub command: Option<Vec<String>>,

    /// Labels, including the project and service labels
    pub labels: HashMap<String, String>,

    /// Exposed and published ports
    pub ports: Vec<PortBinding>,

    /// Bind strings, `source:target[:mode]`
    pub binds: Vec<String>,

    /// Network to attach to (`bridge` when the stack declares none)
    pub network_mode: String,

    /// Restart policy name, e.g. `unless-stopped` or `on-failure:3`
    pub restart_policy: String,
}

/// One exposed container port, optionally published on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: Option<u16>,
    /// Host interface to publish on; all interfaces when `None`
    pub host_ip: Option<String>,
    pub protocol: Protocol,
}

impl PortBinding {
    /// Platform port key, e.g. `80/tcp`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

/// Platform view of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub id: String,

    /// Name without the leading `/`
    pub name: String,

    pub image: String,

    /// Machine state, e.g. `running`, `exited`, `created`
    pub state: String,

    /// Human-readable status, e.g. `Up 5 minutes`
    pub status: String,

    pub labels: HashMap<String, String>,

    pub created: SystemTime,

    pub ports: Vec<PortMapping>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Label lookup.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Network creation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkCreate {
    pub name: String,
    pub driver: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Platform view of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSummary {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub labels: HashMap<String, String>,
}

/// Volume creation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeCreate {
    pub name: String,
    pub driver: Option<String>,
    pub driver_opts: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

/// Platform view of a volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSummary {
    pub name: String,
    pub driver: String,
    pub labels: HashMap<String, String>,
}

/// Select the resources whose `key` label equals `value`.
pub fn has_label(labels: &HashMap<String, String>, key: &str, value: &str) -> bool {
    labels.get(key).is_some_and(|v| v == value)
}
