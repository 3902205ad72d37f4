//! In-memory container platform shared by the integration tests.
//!
//! Mirrors the engine-facing behavior of a real container engine closely
//! enough for orchestration tests: name conflicts, "already stopped" replies
//! and missing resources are reported with the same error kinds.

#![allow(dead_code)]

use async_trait::async_trait;
use berth_core::{
    error::PlatformError,
    platform::{
        ContainerPlatform, ContainerSpec, ContainerSummary, NetworkCreate, NetworkSummary,
        PlatformResult, VolumeCreate, VolumeSummary,
    },
    types::PortMapping,
    EngineConfig, StackOrchestrator,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

pub const MYAPP: &str = r#"
services:
  web:
    image: nginx
    ports: ["8080:80"]
  db:
    image: postgres
    volumes:
      - data:/var/lib/postgresql/data
volumes:
  data: {}
"#;

#[derive(Default)]
struct MockState {
    containers: Vec<ContainerSummary>,
    networks: Vec<NetworkSummary>,
    volumes: Vec<VolumeSummary>,
    calls: Vec<String>,
    next_id: u64,
    fail_create_image: Option<String>,
    fail_start_container: Option<String>,
    fail_remove_network: Option<String>,
}

impl MockState {
    fn name_of(&self, id: &str) -> String {
        self.containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn container_mut(&mut self, id: &str) -> PlatformResult<&mut ContainerSummary> {
        self.containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PlatformError::NotFound(format!("No such container: {}", id)))
    }
}

/// Mock platform (doesn't require a container engine).
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
    create_delay: Option<Duration>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every container create sleeps for `delay` before taking effect.
    pub fn with_create_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self { create_delay: Some(delay), ..Default::default() })
    }

    /// Creating a container from `image` fails as if the image were missing.
    pub fn fail_create_for_image(&self, image: &str) {
        self.state.lock().unwrap().fail_create_image = Some(image.to_string());
    }

    /// Starting the container called `name` fails.
    pub fn fail_start_for(&self, name: &str) {
        self.state.lock().unwrap().fail_start_container = Some(name.to_string());
    }

    /// Removing the network called `name` fails.
    pub fn fail_remove_network(&self, name: &str) {
        self.state.lock().unwrap().fail_remove_network = Some(name.to_string());
    }

    /// Add a container that was not created by the engine.
    pub fn insert_container(&self, name: &str, labels: HashMap<String, String>) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("{:012x}", state.next_id);
        state.containers.push(ContainerSummary {
            id,
            name: name.to_string(),
            image: "busybox".to_string(),
            state: "running".to_string(),
            status: "Up 1 hour".to_string(),
            labels,
            created: SystemTime::UNIX_EPOCH,
            ports: Vec::new(),
        });
    }

    /// Flip a container between running and exited outside the engine.
    pub fn set_running(&self, name: &str, running: bool) {
        let mut state = self.state.lock().unwrap();
        let container = state.containers.iter_mut().find(|c| c.name == name).unwrap();
        container.state = if running { "running" } else { "exited" }.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state.lock().unwrap().containers.iter().map(|c| c.name.clone()).collect()
    }

    pub fn container(&self, name: &str) -> Option<ContainerSummary> {
        self.state.lock().unwrap().containers.iter().find(|c| c.name == name).cloned()
    }

    pub fn network_names(&self) -> Vec<String> {
        self.state.lock().unwrap().networks.iter().map(|n| n.name.clone()).collect()
    }

    pub fn volume_names(&self) -> Vec<String> {
        self.state.lock().unwrap().volumes.iter().map(|v| v.name.clone()).collect()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ContainerPlatform for MockPlatform {
    async fn list_containers(&self, all: bool) -> PlatformResult<Vec<ContainerSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_containers".to_string());
        Ok(state.containers.iter().filter(|c| all || c.is_running()).cloned().collect())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> PlatformResult<String> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_container:{}", spec.name));

        if state.fail_create_image.as_deref() == Some(spec.image.as_str()) {
            return Err(PlatformError::NotFound(format!("No such image: {}", spec.image)));
        }
        if state.containers.iter().any(|c| c.name == spec.name) {
            return Err(PlatformError::Conflict(format!(
                "The container name \"/{}\" is already in use",
                spec.name
            )));
        }

        state.next_id += 1;
        let id = format!("{:012x}", state.next_id);
        let created = SystemTime::UNIX_EPOCH + Duration::from_secs(state.next_id);
        state.containers.push(ContainerSummary {
            id: id.clone(),
            name: spec.name.clone(),
            image: spec.image.clone(),
            state: "created".to_string(),
            status: "Created".to_string(),
            labels: spec.labels.clone(),
            created,
            ports: spec
                .ports
                .iter()
                .map(|p| PortMapping {
                    container_port: p.container_port,
                    host_port: p.host_port,
                    protocol: p.protocol,
                })
                .collect(),
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = state.name_of(id);
        state.calls.push(format!("start_container:{}", name));

        if state.fail_start_container.as_deref() == Some(name.as_str()) {
            return Err(PlatformError::Api {
                status: 500,
                message: "port is already allocated".to_string(),
            });
        }
        let container = state.container_mut(id)?;
        if container.is_running() {
            return Err(PlatformError::NotModified(id.to_string()));
        }
        container.state = "running".to_string();
        container.status = "Up Less than a second".to_string();
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = state.name_of(id);
        state.calls.push(format!("stop_container:{}", name));

        let container = state.container_mut(id)?;
        if !container.is_running() {
            return Err(PlatformError::NotModified(id.to_string()));
        }
        container.state = "exited".to_string();
        container.status = "Exited (0) Less than a second ago".to_string();
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        let name = state.name_of(id);
        state.calls.push(format!("remove_container:{}", name));

        let before = state.containers.len();
        state.containers.retain(|c| c.id != id);
        if state.containers.len() == before {
            return Err(PlatformError::NotFound(format!("No such container: {}", id)));
        }
        Ok(())
    }

    async fn rename_container(&self, id: &str, name: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        let old = state.name_of(id);
        state.calls.push(format!("rename_container:{}->{}", old, name));

        if state.containers.iter().any(|c| c.name == name) {
            return Err(PlatformError::Conflict(format!(
                "The container name \"/{}\" is already in use",
                name
            )));
        }
        state.container_mut(id)?.name = name.to_string();
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> PlatformResult<ContainerSummary> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("inspect_container:{}", id));
        state.container_mut(id).map(|c| c.clone())
    }

    async fn create_network(&self, spec: &NetworkCreate) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_network:{}", spec.name));

        if state.networks.iter().any(|n| n.name == spec.name) {
            return Err(PlatformError::Conflict(format!("network {} already exists", spec.name)));
        }
        state.next_id += 1;
        let id = format!("n{:011x}", state.next_id);
        state.networks.push(NetworkSummary {
            id,
            name: spec.name.clone(),
            driver: spec.driver.clone().unwrap_or_else(|| "bridge".to_string()),
            labels: spec.labels.clone(),
        });
        Ok(())
    }

    async fn list_networks(&self) -> PlatformResult<Vec<NetworkSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_networks".to_string());
        Ok(state.networks.clone())
    }

    async fn remove_network(&self, name: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("remove_network:{}", name));

        if state.fail_remove_network.as_deref() == Some(name) {
            return Err(PlatformError::Api {
                status: 403,
                message: "network has active endpoints".to_string(),
            });
        }
        let before = state.networks.len();
        state.networks.retain(|n| n.name != name);
        if state.networks.len() == before {
            return Err(PlatformError::NotFound(format!("network {} not found", name)));
        }
        Ok(())
    }

    async fn create_volume(&self, spec: &VolumeCreate) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_volume:{}", spec.name));

        // Like the real engine, creating an existing volume is a no-op.
        if !state.volumes.iter().any(|v| v.name == spec.name) {
            state.volumes.push(VolumeSummary {
                name: spec.name.clone(),
                driver: spec.driver.clone().unwrap_or_else(|| "local".to_string()),
                labels: spec.labels.clone(),
            });
        }
        Ok(())
    }

    async fn list_volumes(&self) -> PlatformResult<Vec<VolumeSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("list_volumes".to_string());
        Ok(state.volumes.clone())
    }

    async fn remove_volume(&self, name: &str) -> PlatformResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("remove_volume:{}", name));

        let before = state.volumes.len();
        state.volumes.retain(|v| v.name != name);
        if state.volumes.len() == before {
            return Err(PlatformError::NotFound(format!("no such volume: {}", name)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Orchestrator over `platform` with default configuration.
pub fn orchestrator(platform: &Arc<MockPlatform>) -> StackOrchestrator {
    StackOrchestrator::new(platform.clone(), &EngineConfig::default())
}
