//! Docker Engine platform via bollard.

use super::{
    ContainerPlatform, ContainerSpec, ContainerSummary, NetworkCreate, NetworkSummary,
    PlatformResult, VolumeCreate, VolumeSummary,
};
use crate::error::{BerthError, PlatformError, Result};
use crate::types::{PortMapping, Protocol};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::{
    HostConfig, Port, PortBinding as DockerPortBinding, PortTypeEnum, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use bollard::volume::{CreateVolumeOptions, ListVolumesOptions};
use bollard::{Docker, API_DEFAULT_VERSION};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument};

/// Client-side connection timeout handed to bollard, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Container platform backed by the Docker Engine API.
pub struct DockerPlatform {
    docker: Docker,
    stop_timeout_secs: i64,
}

impl DockerPlatform {
    /// Connect to a Docker engine.
    ///
    /// `host` accepts `unix:///path/to.sock`, `tcp://host:port` or `http://host:port`.
    /// When `None`, the local defaults apply (honouring `DOCKER_HOST`).
    #[instrument]
    pub fn connect(host: Option<&str>, stop_timeout_secs: u64) -> Result<Self> {
        let docker = match host {
            None => Docker::connect_with_local_defaults(),
            #[cfg(unix)]
            Some(h) if h.starts_with("unix://") => {
                Docker::connect_with_unix(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Some(h) if h.starts_with("tcp://") || h.starts_with("http://") => {
                Docker::connect_with_http(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Some(h) => {
                return Err(BerthError::InvalidConfig {
                    reason: format!("unsupported docker host '{}'", h),
                })
            }
        }
        .map_err(|e| BerthError::platform("connect", map_docker_error(e)))?;

        info!(host = host.unwrap_or("local defaults"), "Connected to Docker engine");

        Ok(Self { docker, stop_timeout_secs: stop_grace_secs(stop_timeout_secs) })
    }
}

/// The engine takes the stop grace period as a signed count of seconds.
fn stop_grace_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl ContainerPlatform for DockerPlatform {
    async fn list_containers(&self, all: bool) -> PlatformResult<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> { all, ..Default::default() };
        let containers =
            self.docker.list_containers(Some(options)).await.map_err(map_docker_error)?;
        Ok(containers.into_iter().map(convert_container).collect())
    }

    #[instrument(skip(self, spec), fields(container = %spec.name))]
    async fn create_container(&self, spec: &ContainerSpec) -> PlatformResult<String> {
        let options = CreateContainerOptions { name: spec.name.clone(), platform: None };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(map_docker_error)?;

        for warning in &response.warnings {
            debug!(container = %spec.name, warning = %warning, "Engine warning on create");
        }

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> PlatformResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(map_docker_error)
    }

    async fn stop_container(&self, id: &str) -> PlatformResult<()> {
        let options = StopContainerOptions { t: self.stop_timeout_secs };
        self.docker.stop_container(id, Some(options)).await.map_err(map_docker_error)
    }

    async fn remove_container(&self, id: &str) -> PlatformResult<()> {
        let options = RemoveContainerOptions { force: true, ..Default::default() };
        self.docker.remove_container(id, Some(options)).await.map_err(map_docker_error)
    }

    async fn rename_container(&self, id: &str, name: &str) -> PlatformResult<()> {
        let options = RenameContainerOptions { name: name.to_string() };
        self.docker.rename_container(id, options).await.map_err(map_docker_error)
    }

    async fn inspect_container(&self, id: &str) -> PlatformResult<ContainerSummary> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: HashMap::from([("id".to_string(), vec![id.to_string()])]),
            ..Default::default()
        };
        self.docker
            .list_containers(Some(options))
            .await
            .map_err(map_docker_error)?
            .into_iter()
            .map(convert_container)
            .next()
            .ok_or_else(|| PlatformError::NotFound(format!("no such container: {}", id)))
    }

    async fn create_network(&self, spec: &NetworkCreate) -> PlatformResult<()> {
        let options = CreateNetworkOptions::<String> {
            name: spec.name.clone(),
            driver: spec.driver.clone().unwrap_or_else(|| "bridge".to_string()),
            labels: spec.labels.clone(),
            check_duplicate: true,
            ..Default::default()
        };
        self.docker.create_network(options).await.map(|_| ()).map_err(map_docker_error)
    }

    async fn list_networks(&self) -> PlatformResult<Vec<NetworkSummary>> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions<String>>)
            .await
            .map_err(map_docker_error)?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: n.id.unwrap_or_default(),
                name: n.name.unwrap_or_default(),
                driver: n.driver.unwrap_or_default(),
                labels: n.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_network(&self, name: &str) -> PlatformResult<()> {
        self.docker.remove_network(name).await.map_err(map_docker_error)
    }

    async fn create_volume(&self, spec: &VolumeCreate) -> PlatformResult<()> {
        let options = CreateVolumeOptions::<String> {
            name: spec.name.clone(),
            driver: spec.driver.clone().unwrap_or_else(|| "local".to_string()),
            driver_opts: spec.driver_opts.clone(),
            labels: spec.labels.clone(),
        };
        self.docker.create_volume(options).await.map(|_| ()).map_err(map_docker_error)
    }

    async fn list_volumes(&self) -> PlatformResult<Vec<VolumeSummary>> {
        let response = self
            .docker
            .list_volumes(None::<ListVolumesOptions<String>>)
            .await
            .map_err(map_docker_error)?;

        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| VolumeSummary { name: v.name, driver: v.driver, labels: v.labels })
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> PlatformResult<()> {
        self.docker.remove_volume(name, None).await.map_err(map_docker_error)
    }

    fn name(&self) -> &str {
        "docker"
    }
}

/// Translate engine status codes into the tolerances the engine understands.
fn map_docker_error(err: DockerError) -> PlatformError {
    match err {
        DockerError::DockerResponseServerError { status_code, message } => match status_code {
            304 => PlatformError::NotModified(message),
            404 => PlatformError::NotFound(message),
            409 => PlatformError::Conflict(message),
            status => PlatformError::Api { status, message },
        },
        other => PlatformError::Transport(other.to_string()),
    }
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    let mut port_bindings: HashMap<String, Option<Vec<DockerPortBinding>>> = HashMap::new();

    for port in &spec.ports {
        exposed_ports.insert(port.key(), HashMap::new());
        if let Some(host_port) = port.host_port {
            let binding = DockerPortBinding {
                host_ip: port.host_ip.clone(),
                host_port: Some(host_port.to_string()),
            };
            port_bindings
                .entry(port.key())
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(binding);
        }
    }

    let host_config = HostConfig {
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        binds: (!spec.binds.is_empty()).then(|| spec.binds.clone()),
        network_mode: Some(spec.network_mode.clone()),
        restart_policy: Some(restart_policy(&spec.restart_policy)),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        env: Some(spec.env.clone()),
        cmd: spec.command.clone(),
        labels: Some(spec.labels.clone()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        ..Default::default()
    }
}

fn restart_policy(policy: &str) -> RestartPolicy {
    let (name, retries) = match policy.split_once(':') {
        Some((name, count)) => (name, count.parse::<i64>().ok()),
        None => (policy, None),
    };

    let name = match name {
        "no" => RestartPolicyNameEnum::NO,
        "always" => RestartPolicyNameEnum::ALWAYS,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::UNLESS_STOPPED,
    };

    RestartPolicy { name: Some(name), maximum_retry_count: retries }
}

fn convert_container(c: bollard::models::ContainerSummary) -> ContainerSummary {
    let name = c
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_default();

    let created = c
        .created
        .and_then(|secs| u64::try_from(secs).ok())
        .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    ContainerSummary {
        id: c.id.unwrap_or_default(),
        name,
        image: c.image.unwrap_or_default(),
        state: c.state.unwrap_or_default(),
        status: c.status.unwrap_or_default(),
        labels: c.labels.unwrap_or_default(),
        created,
        ports: convert_ports(c.ports.unwrap_or_default()),
    }
}

/// The engine reports a published port once per address family; keep one.
fn convert_ports(ports: Vec<Port>) -> Vec<PortMapping> {
    let mut mappings: Vec<PortMapping> = Vec::new();
    for port in ports {
        let protocol = match port.typ {
            Some(PortTypeEnum::UDP) => Protocol::Udp,
            Some(PortTypeEnum::SCTP) => Protocol::Sctp,
            _ => Protocol::Tcp,
        };
        let mapping = PortMapping {
            container_port: port.private_port,
            host_port: port.public_port,
            protocol,
        };
        if !mappings.contains(&mapping) {
            mappings.push(mapping);
        }
    }
    mappings
}
