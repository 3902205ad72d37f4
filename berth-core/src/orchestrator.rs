//! Stack orchestration.
//!
//! Sequences the provisioners for `deploy` (networks, then volumes, then
//! containers one service at a time) and tears stacks down for `stop` and
//! `remove`. Teardown never aborts on a single resource: each failure is logged
//! and the pass moves on.

use crate::compose::{self, ComposeParser};
use crate::config::EngineConfig;
use crate::error::{BerthError, PlatformError, Result};
use crate::inspector::StackInspector;
use crate::lease::StackLeases;
use crate::naming;
use crate::observability::metrics;
use crate::platform::{
    ContainerPlatform, ContainerSpec, ContainerSummary, DockerPlatform, GuardedPlatform,
};
use crate::provision::{
    ContainerProvisioner, CreatedContainer, NetworkProvisioner, VolumeProvisioner,
};
use crate::types::{DeploymentSummary, Stack, StackDetails, TeardownCount, TeardownReport};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Stack orchestrator: the engine's entry point for all five operations.
pub struct StackOrchestrator {
    platform: Arc<dyn ContainerPlatform>,
    networks: NetworkProvisioner,
    volumes: VolumeProvisioner,
    containers: ContainerProvisioner,
    inspector: StackInspector,
    leases: StackLeases,
    strict_validation: bool,
}

impl StackOrchestrator {
    /// Create an orchestrator over an existing platform client.
    pub fn new(platform: Arc<dyn ContainerPlatform>, config: &EngineConfig) -> Self {
        debug!(platform = platform.name(), "Creating stack orchestrator");
        Self {
            networks: NetworkProvisioner::new(platform.clone()),
            volumes: VolumeProvisioner::new(platform.clone()),
            containers: ContainerProvisioner::new(platform.clone(), config.project_dir.clone()),
            inspector: StackInspector::new(platform.clone()),
            leases: StackLeases::new(),
            strict_validation: config.strict_validation,
            platform,
        }
    }

    /// Connect to Docker as configured, with deadlines and retries on every call.
    pub fn connect(config: &EngineConfig) -> Result<Self> {
        let docker =
            DockerPlatform::connect(config.docker_host.as_deref(), config.stop_timeout_secs)?;
        let platform = GuardedPlatform::from_config(docker, config);
        Ok(Self::new(Arc::new(platform), config))
    }

    /// Deploy a stack from definition text.
    ///
    /// Name, document and (when strict) field checks run before any platform
    /// call, and every container request is built up front so malformed entries
    /// fail without side effects. A failing service rolls back the containers
    /// created by this call and restores the ones they replaced; networks and
    /// volumes are left in place so a retry can reuse them.
    #[instrument(skip(self, definition_text), fields(stack = %name))]
    pub async fn deploy(&self, name: &str, definition_text: &str) -> Result<DeploymentSummary> {
        let started = Instant::now();

        naming::validate_stack_name(name)?;
        let definition = ComposeParser::parse(definition_text)?;
        if self.strict_validation {
            compose::validate(&definition)?;
        }
        let specs = definition
            .services
            .iter()
            .map(|(key, service)| {
                let spec = self.containers.build_spec(name, key, service, &definition)?;
                Ok((key.clone(), spec))
            })
            .collect::<Result<Vec<(String, ContainerSpec)>>>()?;

        let _lease = self.leases.acquire(name).await;

        info!(
            services = definition.services.len(),
            networks = definition.networks.len(),
            volumes = definition.volumes.len(),
            "Deploying stack"
        );

        let mut networks = Vec::with_capacity(definition.networks.len());
        for (key, spec) in &definition.networks {
            let network = self.networks.ensure(name, key, spec).await.inspect_err(|e| {
                error!(network = %key, error = %e, "Network provisioning failed");
                metrics::record_deploy_failure("network");
            })?;
            networks.push(network);
        }

        let mut volumes = Vec::with_capacity(definition.volumes.len());
        for (key, spec) in &definition.volumes {
            let volume = self.volumes.ensure(name, key, spec).await.inspect_err(|e| {
                error!(volume = %key, error = %e, "Volume provisioning failed");
                metrics::record_deploy_failure("volume");
            })?;
            volumes.push(volume);
        }

        let services = self.deploy_services(name, &specs).await?;

        metrics::record_deploy(started.elapsed().as_secs_f64());
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Stack deployed");

        Ok(DeploymentSummary {
            stack_name: name.to_string(),
            message: format!(
                "Stack '{}' deployed with {} service(s), {} network(s), {} volume(s)",
                name,
                services.len(),
                networks.len(),
                volumes.len()
            ),
            services,
            networks,
            volumes,
        })
    }

    /// Create and start every service in declaration order.
    async fn deploy_services(
        &self,
        stack: &str,
        specs: &[(String, ContainerSpec)],
    ) -> Result<Vec<String>> {
        let mut created: Vec<CreatedContainer> = Vec::with_capacity(specs.len());

        for (key, spec) in specs {
            let result = match self.containers.create(stack, key, spec).await {
                Ok(container) => {
                    created.push(container.clone());
                    self.containers.start(&container).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!(service = %key, error = %e, "Service deployment failed, rolling back");
                metrics::record_deploy_failure("container");
                self.rollback(&created).await;
                return Err(e);
            }
        }

        // Every replacement is running; the previous containers can go.
        for displaced in created.iter().filter_map(|c| c.displaced.as_ref()) {
            self.containers.discard(displaced).await;
        }

        Ok(created.into_iter().map(|c| c.name).collect())
    }

    /// Undo the containers created by a failed deploy and bring back the ones
    /// they replaced. Never fails.
    async fn rollback(&self, created: &[CreatedContainer]) {
        if created.is_empty() {
            return;
        }
        warn!(containers = created.len(), "Rolling back containers created by this deploy");

        for container in created.iter().rev() {
            match self.platform.stop_container(&container.id).await {
                Ok(()) | Err(PlatformError::NotModified(_)) => {}
                Err(e) => warn!(
                    container = %container.name,
                    error = %e,
                    "Failed to stop container during rollback"
                ),
            }

            match self.platform.remove_container(&container.id).await {
                Ok(()) | Err(PlatformError::NotFound(_)) => metrics::record_rollback("removed"),
                Err(e) => {
                    metrics::record_rollback("failed");
                    warn!(
                        container = %container.name,
                        error = %e,
                        "Failed to remove container during rollback"
                    );
                }
            }

            if let Some(displaced) = &container.displaced {
                self.containers.restore(displaced).await;
                metrics::record_rollback("restored");
            }
        }
    }

    /// All stacks, rebuilt from platform state.
    pub async fn list(&self) -> Result<Vec<Stack>> {
        self.inspector.list().await
    }

    /// One stack, rebuilt from platform state.
    pub async fn get_details(&self, name: &str) -> Result<StackDetails> {
        self.inspector.get_details(name).await
    }

    /// Stop every container of a stack concurrently.
    ///
    /// Already-stopped containers count as success. Per-container failures are
    /// logged and reported, not raised.
    #[instrument(skip(self), fields(stack = %name))]
    pub async fn stop(&self, name: &str) -> Result<TeardownReport> {
        let resources = self.inspector.discover(name).await?;
        if resources.is_empty() {
            return Err(BerthError::NotFound { stack: name.to_string() });
        }

        info!(containers = resources.containers.len(), "Stopping stack");

        let results = join_all(resources.containers.iter().map(|c| self.stop_container(c))).await;
        let report =
            TeardownReport { containers: TeardownCount::tally(&results), ..Default::default() };

        metrics::record_teardown_failures("container", report.containers.failed);
        log_report("Stack stopped", &report);
        Ok(report)
    }

    /// Remove every container and network of a stack, and its volumes when asked.
    ///
    /// Maximal cleanup over atomicity: a resource that cannot be removed is
    /// logged and the rest are still removed.
    #[instrument(skip(self), fields(stack = %name, remove_volumes))]
    pub async fn remove(&self, name: &str, remove_volumes: bool) -> Result<TeardownReport> {
        let _lease = self.leases.acquire(name).await;

        let resources = self.inspector.discover(name).await?;
        if resources.is_empty() {
            return Err(BerthError::NotFound { stack: name.to_string() });
        }

        info!(
            containers = resources.containers.len(),
            networks = resources.networks.len(),
            volumes = resources.volumes.len(),
            "Removing stack"
        );

        let mut report = TeardownReport::default();

        let results = join_all(resources.containers.iter().map(|c| self.remove_container(c))).await;
        report.containers = TeardownCount::tally(&results);

        let results = join_all(resources.networks.iter().map(|n| async move {
            self.platform.remove_network(&n.name).await.or_else(tolerate_missing).inspect_err(|e| {
                warn!(network = %n.name, error = %e, "Failed to remove network");
            })
        }))
        .await;
        report.networks = TeardownCount::tally(&results);

        if remove_volumes {
            let results = join_all(resources.volumes.iter().map(|v| async move {
                self.platform.remove_volume(&v.name).await.or_else(tolerate_missing).inspect_err(
                    |e| {
                        warn!(volume = %v.name, error = %e, "Failed to remove volume");
                    },
                )
            }))
            .await;
            report.volumes = TeardownCount::tally(&results);
        }

        metrics::record_teardown_failures("container", report.containers.failed);
        metrics::record_teardown_failures("network", report.networks.failed);
        metrics::record_teardown_failures("volume", report.volumes.failed);
        log_report("Stack removed", &report);
        Ok(report)
    }

    async fn stop_container(
        &self,
        container: &ContainerSummary,
    ) -> std::result::Result<(), PlatformError> {
        match self.platform.stop_container(&container.id).await {
            Ok(()) | Err(PlatformError::NotModified(_)) | Err(PlatformError::NotFound(_)) => Ok(()),
            Err(e) => {
                warn!(container = %container.name, error = %e, "Failed to stop container");
                Err(e)
            }
        }
    }

    async fn remove_container(
        &self,
        container: &ContainerSummary,
    ) -> std::result::Result<(), PlatformError> {
        // Removal is forced, so a failed stop does not block it.
        let _ = self.stop_container(container).await;
        self.platform.remove_container(&container.id).await.or_else(tolerate_missing).inspect_err(
            |e| {
                warn!(container = %container.name, error = %e, "Failed to remove container");
            },
        )
    }
}

/// A resource that vanished between discovery and removal is already gone.
fn tolerate_missing(e: PlatformError) -> std::result::Result<(), PlatformError> {
    match e {
        PlatformError::NotFound(_) => Ok(()),
        e => Err(e),
    }
}

fn log_report(message: &str, report: &TeardownReport) {
    if report.is_clean() {
        info!(?report, "{}", message);
    } else {
        warn!(?report, "{} with failures", message);
    }
}
