//! Stack domain types.
//!
//! A stack is never stored; these views are rebuilt from labeled platform
//! resources every time they are requested.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Aggregate status of a stack, derived from its containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackStatus {
    /// Every member container is running.
    Running,
    /// No member container is running.
    Stopped,
    /// Some, but not all, member containers are running.
    Partial,
}

impl StackStatus {
    /// Derive the aggregate status from per-container running flags.
    ///
    /// An empty set counts as stopped.
    pub fn derive<I: IntoIterator<Item = bool>>(running: I) -> Self {
        let (mut up, mut total) = (0usize, 0usize);
        for is_running in running {
            total += 1;
            if is_running {
                up += 1;
            }
        }

        if total > 0 && up == total {
            StackStatus::Running
        } else if up == 0 {
            StackStatus::Stopped
        } else {
            StackStatus::Partial
        }
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackStatus::Running => write!(f, "running"),
            StackStatus::Stopped => write!(f, "stopped"),
            StackStatus::Partial => write!(f, "partial"),
        }
    }
}

/// Multi-service stack, reconstructed from platform state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    /// Stack name (the project label value)
    pub name: String,

    /// One instance per member container
    pub services: Vec<ServiceInstance>,

    /// Names of member networks
    pub networks: Vec<String>,

    /// Names of member volumes
    pub volumes: Vec<String>,

    /// Creation time of the oldest member container
    pub created_at: SystemTime,

    /// Aggregate status
    pub status: StackStatus,
}

/// A running (or stopped) container belonging to a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Container name, e.g. `myapp_web_1`
    pub name: String,

    /// Platform container ID
    pub container_id: String,

    /// Image reference
    pub image: String,

    /// Platform state (e.g. `running`, `exited`)
    pub status: String,

    /// Published ports
    pub ports: Vec<PortMapping>,
}

impl ServiceInstance {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Port mapping (host:container).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port inside the container
    pub container_port: u16,

    /// Published host port, if any
    pub host_port: Option<u16>,

    /// Protocol (tcp, udp, sctp)
    pub protocol: Protocol,
}

/// Network protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Sctp => write!(f, "sctp"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "sctp" => Ok(Protocol::Sctp),
            _ => Err(format!("unknown protocol '{}'", s)),
        }
    }
}

/// Detailed view of a single stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDetails {
    /// Summary view, same as `list()` returns
    #[serde(flatten)]
    pub stack: Stack,

    /// Per-service detail, in the same order as `stack.services`
    pub service_details: Vec<ServiceDetail>,

    /// Member networks
    pub network_details: Vec<ResourceDetail>,

    /// Member volumes
    pub volume_details: Vec<ResourceDetail>,
}

/// Extra information about one member container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDetail {
    /// Compose service key (role label value)
    pub service: String,

    /// Container name
    pub container_name: String,

    /// Human-readable platform status, e.g. `Up 3 minutes`
    pub status_text: String,

    /// Container creation time
    pub created_at: SystemTime,
}

/// Network or volume summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDetail {
    /// Platform resource name
    pub name: String,

    /// Compose key (role label value)
    pub key: String,

    /// Driver name
    pub driver: String,
}

/// Result of a `deploy` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSummary {
    /// Stack name
    pub stack_name: String,

    /// Container names created, in deployment order
    pub services: Vec<String>,

    /// Network names ensured
    pub networks: Vec<String>,

    /// Volume names ensured
    pub volumes: Vec<String>,

    /// Human-readable outcome
    pub message: String,
}

/// Outcome counts of a teardown (`stop` or `remove`) pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownReport {
    pub containers: TeardownCount,
    pub networks: TeardownCount,
    pub volumes: TeardownCount,
}

impl TeardownReport {
    /// True when every attempted teardown call succeeded.
    pub fn is_clean(&self) -> bool {
        self.containers.failed == 0 && self.networks.failed == 0 && self.volumes.failed == 0
    }
}

/// Succeeded/failed counts for one resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownCount {
    pub succeeded: usize,
    pub failed: usize,
}

impl TeardownCount {
    /// Tally a batch of per-resource outcomes.
    pub fn tally<T, E>(results: &[std::result::Result<T, E>]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        Self { succeeded, failed: results.len() - succeeded }
    }
}
