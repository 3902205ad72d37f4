//! Container provisioning.
//!
//! Turns one service entry into a platform container: environment, port
//! bindings, mounts, network attachment and restart policy, then creates and
//! starts it. Create and start are separate steps so the orchestrator can roll
//! back a container that was created but failed to start.

use super::merge_labels;
use crate::compose::{MountEntry, MountSource, PortEntry, ServiceSpec, StackDefinition};
use crate::error::{BerthError, PlatformError, Result};
use crate::naming::{self, Role, LABEL_PROJECT};
use crate::platform::{ContainerPlatform, ContainerSpec, ContainerSummary, PortBinding};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Network mode used when a stack declares no networks.
pub const DEFAULT_NETWORK_MODE: &str = "bridge";

/// A container created by this engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedContainer {
    pub id: String,
    pub name: String,
    pub service: String,

    /// Earlier container of the same service, moved aside to make room
    pub displaced: Option<DisplacedContainer>,
}

/// A stack container renamed out of the way of its replacement.
///
/// It is removed once the whole deploy succeeds, or renamed back (and
/// restarted if it was running) when the deploy rolls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplacedContainer {
    pub id: String,
    /// The name it had, and gets back on restore
    pub name: String,
    pub was_running: bool,
}

/// Creates and starts service containers.
pub struct ContainerProvisioner {
    platform: Arc<dyn ContainerPlatform>,
    project_dir: Option<PathBuf>,
}

impl ContainerProvisioner {
    pub fn new(platform: Arc<dyn ContainerPlatform>, project_dir: Option<PathBuf>) -> Self {
        Self { platform, project_dir }
    }

    /// Build the platform request for one service.
    pub fn build_spec(
        &self,
        stack: &str,
        key: &str,
        service: &ServiceSpec,
        definition: &StackDefinition,
    ) -> Result<ContainerSpec> {
        container_spec(stack, key, service, definition, self.project_dir.as_deref())
    }

    /// Create the container for one service without starting it.
    ///
    /// A container with the same name that belongs to this stack is moved
    /// aside, not removed. One that belongs to something else is an error.
    #[instrument(skip(self, spec), fields(container = %spec.name, image = %spec.image))]
    pub async fn create(
        &self,
        stack: &str,
        key: &str,
        spec: &ContainerSpec,
    ) -> Result<CreatedContainer> {
        let (id, displaced) = match self.platform.create_container(spec).await {
            Ok(id) => (id, None),
            Err(PlatformError::Conflict(_)) => {
                let displaced = self.displace(stack, spec).await?;
                match self.platform.create_container(spec).await {
                    Ok(id) => (id, Some(displaced)),
                    Err(e) => {
                        self.restore(&displaced).await;
                        return Err(create_error(spec, e));
                    }
                }
            }
            Err(e) => return Err(create_error(spec, e)),
        };

        info!(id = %short_id(&id), replacing = displaced.is_some(), "Created container");
        Ok(CreatedContainer { id, name: spec.name.clone(), service: key.to_string(), displaced })
    }

    /// Start a container returned by [`create`](Self::create).
    pub async fn start(&self, container: &CreatedContainer) -> Result<()> {
        self.platform.start_container(&container.id).await.map_err(|e| {
            BerthError::platform("start_container", e)
                .with_hint("check port availability and bind mount paths")
        })?;
        info!(container = %container.name, "Started container");
        Ok(())
    }

    /// Put a displaced container back under its own name. Never fails.
    pub async fn restore(&self, displaced: &DisplacedContainer) {
        if let Err(e) = self.platform.rename_container(&displaced.id, &displaced.name).await {
            warn!(container = %displaced.name, error = %e, "Failed to restore displaced container");
            return;
        }
        if displaced.was_running {
            match self.platform.start_container(&displaced.id).await {
                Ok(()) | Err(PlatformError::NotModified(_)) => {}
                Err(e) => warn!(
                    container = %displaced.name,
                    error = %e,
                    "Failed to restart restored container"
                ),
            }
        }
        info!(container = %displaced.name, "Restored previous container");
    }

    /// Remove a displaced container once its replacement is in place. Never fails.
    pub async fn discard(&self, displaced: &DisplacedContainer) {
        match self.platform.remove_container(&displaced.id).await {
            Ok(()) | Err(PlatformError::NotFound(_)) => {
                debug!(container = %displaced.name, "Removed replaced container")
            }
            Err(e) => warn!(
                container = %displaced.name,
                error = %e,
                "Failed to remove replaced container"
            ),
        }
    }

    /// Rename the stack's existing container out of the way and stop it.
    async fn displace(&self, stack: &str, spec: &ContainerSpec) -> Result<DisplacedContainer> {
        let aside = naming::displaced_container_name(&spec.name);
        let containers = self
            .platform
            .list_containers(true)
            .await
            .map_err(|e| BerthError::platform("list_containers", e))?;

        let Some(existing) = containers.iter().find(|c| c.name == spec.name) else {
            // The conflict was not about the name; nothing of ours to move.
            return Err(BerthError::platform(
                "create_container",
                PlatformError::Conflict(format!("container '{}' conflicts", spec.name)),
            ));
        };
        ensure_owned(stack, existing)?;

        // Left behind by an interrupted deploy.
        if let Some(stale) = containers.iter().find(|c| c.name == aside) {
            ensure_owned(stack, stale)?;
            warn!(container = %aside, "Removing stale displaced container");
            match self.platform.remove_container(&stale.id).await {
                Ok(()) | Err(PlatformError::NotFound(_)) => {}
                Err(e) => return Err(BerthError::platform("remove_container", e)),
            }
        }

        self.platform
            .rename_container(&existing.id, &aside)
            .await
            .map_err(|e| BerthError::platform("rename_container", e))?;

        let displaced = DisplacedContainer {
            id: existing.id.clone(),
            name: spec.name.clone(),
            was_running: existing.is_running(),
        };

        match self.platform.stop_container(&existing.id).await {
            Ok(()) | Err(PlatformError::NotModified(_)) => {}
            Err(e) => {
                // Put it back before giving up.
                self.restore(&displaced).await;
                return Err(BerthError::platform("stop_container", e));
            }
        }

        info!(id = %short_id(&existing.id), aside = %aside, "Moved existing container aside");
        Ok(displaced)
    }
}

/// A same-named container must carry this stack's project label to be replaced.
fn ensure_owned(stack: &str, container: &ContainerSummary) -> Result<()> {
    if container.label(LABEL_PROJECT) == Some(stack) {
        return Ok(());
    }
    Err(BerthError::platform(
        "create_container",
        PlatformError::Conflict(format!("name '{}' is already in use", container.name)),
    )
    .with_hint("remove or rename the container that is not part of this stack"))
}

fn create_error(spec: &ContainerSpec, e: PlatformError) -> BerthError {
    BerthError::platform("create_container", e)
        .with_hint(format!("check image availability for '{}'", spec.image))
}

/// Translate one service entry into a platform container request.
///
/// `project_dir` anchors relative bind-mount sources; when `None` they are
/// passed to the platform verbatim.
pub fn container_spec(
    stack: &str,
    key: &str,
    service: &ServiceSpec,
    definition: &StackDefinition,
    project_dir: Option<&Path>,
) -> Result<ContainerSpec> {
    let ports = service
        .ports
        .iter()
        .map(|entry| {
            let port = PortEntry::parse(entry).map_err(|reason| {
                BerthError::validation(format!("service '{}' port {}", key, reason))
            })?;
            Ok(PortBinding {
                container_port: port.container_port,
                host_port: port.host_port,
                host_ip: port.host_ip,
                protocol: port.protocol,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let binds = service
        .volumes
        .iter()
        .map(|entry| {
            let mount = MountEntry::parse(entry).map_err(|reason| {
                BerthError::validation(format!("service '{}' volume {}", key, reason))
            })?;
            Ok(bind_string(stack, &mount, project_dir))
        })
        .collect::<Result<Vec<_>>>()?;

    let network_mode = definition
        .attachment_network()
        .map(|network| naming::network_name(stack, network))
        .unwrap_or_else(|| DEFAULT_NETWORK_MODE.to_string());

    Ok(ContainerSpec {
        name: naming::container_name(stack, key),
        image: service.image.clone(),
        env: service.environment.to_list(),
        command: service
            .command
            .as_ref()
            .map(|c| c.to_args())
            .transpose()
            .map_err(|reason| BerthError::validation(format!("service '{}' {}", key, reason)))?,
        labels: merge_labels(&service.labels, naming::labels_for(stack, Role::Service, key)),
        ports,
        binds,
        network_mode,
        restart_policy: service.restart_policy().to_string(),
    })
}

/// `source:target[:mode]`, with named volumes prefixed by the stack name.
fn bind_string(stack: &str, mount: &MountEntry, project_dir: Option<&Path>) -> String {
    let source = match &mount.source {
        MountSource::Named(volume) => naming::volume_name(stack, volume),
        MountSource::Bind(path) => match project_dir {
            Some(dir) if path.starts_with('.') => {
                dir.join(path.strip_prefix("./").unwrap_or(path)).to_string_lossy().to_string()
            }
            _ => path.clone(),
        },
    };
    match &mount.mode {
        Some(mode) => format!("{}:{}:{}", source, mount.target, mode),
        None => format!("{}:{}", source, mount.target),
    }
}

fn short_id(id: &str) -> &str {
    &id[..12.min(id.len())]
}
