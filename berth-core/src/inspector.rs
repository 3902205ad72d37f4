//! Stack discovery from live platform state.
//!
//! Stacks are never cached. Every call lists containers, networks and volumes
//! from the platform and groups them by the project label, so the result always
//! reflects what exists at call time.

use crate::error::{BerthError, Result};
use crate::naming::{self, LABEL_NETWORK, LABEL_PROJECT, LABEL_SERVICE, LABEL_VOLUME};
use crate::platform::{
    has_label, ContainerPlatform, ContainerSummary, NetworkSummary, VolumeSummary,
};
use crate::types::{
    ResourceDetail, ServiceDetail, ServiceInstance, Stack, StackDetails, StackStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, instrument};

/// All platform resources carrying one stack's project label.
#[derive(Debug, Clone, Default)]
pub struct StackResources {
    pub containers: Vec<ContainerSummary>,
    pub networks: Vec<NetworkSummary>,
    pub volumes: Vec<VolumeSummary>,
}

impl StackResources {
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.networks.is_empty() && self.volumes.is_empty()
    }
}

/// Rebuilds stack views from platform state.
pub struct StackInspector {
    platform: Arc<dyn ContainerPlatform>,
}

impl StackInspector {
    pub fn new(platform: Arc<dyn ContainerPlatform>) -> Self {
        Self { platform }
    }

    /// Every resource labeled with `stack`, including stopped containers.
    #[instrument(skip(self))]
    pub async fn discover(&self, stack: &str) -> Result<StackResources> {
        let (containers, networks, volumes) = self.scan().await?;

        let resources = StackResources {
            containers: containers
                .into_iter()
                .filter(|c| has_label(&c.labels, LABEL_PROJECT, stack))
                .collect(),
            networks: networks
                .into_iter()
                .filter(|n| has_label(&n.labels, LABEL_PROJECT, stack))
                .collect(),
            volumes: volumes
                .into_iter()
                .filter(|v| has_label(&v.labels, LABEL_PROJECT, stack))
                .collect(),
        };

        debug!(
            containers = resources.containers.len(),
            networks = resources.networks.len(),
            volumes = resources.volumes.len(),
            "Discovered stack resources"
        );

        Ok(resources)
    }

    /// All stacks that currently have at least one container, sorted by name.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Stack>> {
        let (containers, networks, volumes) = self.scan().await?;

        let mut groups: BTreeMap<String, Vec<ContainerSummary>> = BTreeMap::new();
        for container in containers {
            if let Some(project) = container.label(LABEL_PROJECT).map(str::to_string) {
                groups.entry(project).or_default().push(container);
            }
        }

        let stacks = groups
            .into_iter()
            .map(|(name, containers)| {
                let resources = StackResources {
                    containers,
                    networks: networks
                        .iter()
                        .filter(|n| has_label(&n.labels, LABEL_PROJECT, &name))
                        .cloned()
                        .collect(),
                    volumes: volumes
                        .iter()
                        .filter(|v| has_label(&v.labels, LABEL_PROJECT, &name))
                        .cloned()
                        .collect(),
                };
                build_stack(&name, &resources)
            })
            .collect();

        Ok(stacks)
    }

    /// Detailed view of one stack. Not found when no container carries its label.
    #[instrument(skip(self))]
    pub async fn get_details(&self, stack: &str) -> Result<StackDetails> {
        let resources = self.discover(stack).await?;
        if resources.containers.is_empty() {
            return Err(BerthError::NotFound { stack: stack.to_string() });
        }
        Ok(build_details(stack, &resources))
    }

    async fn scan(
        &self,
    ) -> Result<(Vec<ContainerSummary>, Vec<NetworkSummary>, Vec<VolumeSummary>)> {
        tokio::try_join!(
            async {
                self.platform
                    .list_containers(true)
                    .await
                    .map_err(|e| BerthError::platform("list_containers", e))
            },
            async {
                self.platform
                    .list_networks()
                    .await
                    .map_err(|e| BerthError::platform("list_networks", e))
            },
            async {
                self.platform
                    .list_volumes()
                    .await
                    .map_err(|e| BerthError::platform("list_volumes", e))
            },
        )
    }
}

/// Containers sorted by name so views are stable across calls.
fn sorted_containers(resources: &StackResources) -> Vec<&ContainerSummary> {
    let mut containers: Vec<&ContainerSummary> = resources.containers.iter().collect();
    containers.sort_by(|a, b| a.name.cmp(&b.name));
    containers
}

fn build_stack(name: &str, resources: &StackResources) -> Stack {
    let containers = sorted_containers(resources);

    let services = containers
        .iter()
        .map(|c| ServiceInstance {
            name: c.name.clone(),
            container_id: c.id.clone(),
            image: c.image.clone(),
            status: c.state.clone(),
            ports: c.ports.clone(),
        })
        .collect();

    let created_at =
        containers.iter().map(|c| c.created).min().unwrap_or(SystemTime::UNIX_EPOCH);

    let mut networks: Vec<String> = resources.networks.iter().map(|n| n.name.clone()).collect();
    networks.sort();
    let mut volumes: Vec<String> = resources.volumes.iter().map(|v| v.name.clone()).collect();
    volumes.sort();

    Stack {
        name: name.to_string(),
        services,
        networks,
        volumes,
        created_at,
        status: StackStatus::derive(containers.iter().map(|c| c.is_running())),
    }
}

fn build_details(name: &str, resources: &StackResources) -> StackDetails {
    let stack = build_stack(name, resources);

    let service_details = sorted_containers(resources)
        .into_iter()
        .map(|c| ServiceDetail {
            service: c
                .label(LABEL_SERVICE)
                .map(str::to_string)
                .or_else(|| naming::service_key_from_container(name, &c.name))
                .unwrap_or_else(|| c.name.clone()),
            container_name: c.name.clone(),
            status_text: c.status.clone(),
            created_at: c.created,
        })
        .collect();

    let network_details = resource_details(
        resources.networks.iter().map(|n| (&n.name, &n.driver, &n.labels)),
        name,
        LABEL_NETWORK,
    );
    let volume_details = resource_details(
        resources.volumes.iter().map(|v| (&v.name, &v.driver, &v.labels)),
        name,
        LABEL_VOLUME,
    );

    StackDetails { stack, service_details, network_details, volume_details }
}

fn resource_details<'a>(
    resources: impl Iterator<Item = (&'a String, &'a String, &'a HashMap<String, String>)>,
    stack: &str,
    role_label: &str,
) -> Vec<ResourceDetail> {
    let prefix = format!("{}_", stack);
    let mut details: Vec<ResourceDetail> = resources
        .map(|(name, driver, labels)| ResourceDetail {
            name: name.clone(),
            key: labels
                .get(role_label)
                .cloned()
                .unwrap_or_else(|| name.strip_prefix(&prefix).unwrap_or(name).to_string()),
            driver: driver.clone(),
        })
        .collect();
    details.sort_by(|a, b| a.name.cmp(&b.name));
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{labels_for, Role};
    use std::time::Duration;

    fn container(stack: &str, service: &str, state: &str, age_secs: u64) -> ContainerSummary {
        ContainerSummary {
            id: format!("id-{}-{}", stack, service),
            name: naming::container_name(stack, service),
            image: "nginx".to_string(),
            state: state.to_string(),
            status: String::new(),
            labels: labels_for(stack, Role::Service, service),
            created: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 - age_secs),
            ports: Vec::new(),
        }
    }

    #[test]
    fn test_build_stack_orders_and_derives() {
        let resources = StackResources {
            containers: vec![
                container("myapp", "web", "running", 10),
                container("myapp", "db", "exited", 50),
            ],
            networks: Vec::new(),
            volumes: vec![VolumeSummary {
                name: "myapp_data".to_string(),
                driver: "local".to_string(),
                labels: labels_for("myapp", Role::Volume, "data"),
            }],
        };

        let stack = build_stack("myapp", &resources);
        let names: Vec<&str> = stack.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["myapp_db_1", "myapp_web_1"]);
        assert_eq!(stack.status, StackStatus::Partial);
        assert_eq!(stack.volumes, vec!["myapp_data"]);
        assert_eq!(stack.created_at, SystemTime::UNIX_EPOCH + Duration::from_secs(999_950));
    }

    #[test]
    fn test_details_fall_back_to_name_when_role_label_missing() {
        let mut orphan = container("myapp", "worker", "running", 1);
        orphan.labels.remove(LABEL_SERVICE);
        let resources = StackResources {
            containers: vec![orphan],
            networks: vec![NetworkSummary {
                id: "n1".to_string(),
                name: "myapp_front".to_string(),
                driver: "bridge".to_string(),
                labels: HashMap::from([(LABEL_PROJECT.to_string(), "myapp".to_string())]),
            }],
            volumes: Vec::new(),
        };

        let details = build_details("myapp", &resources);
        assert_eq!(details.service_details[0].service, "worker");
        assert_eq!(details.network_details[0].key, "front");
        assert_eq!(details.stack.status, StackStatus::Running);
    }
}
