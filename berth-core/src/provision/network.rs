//! Network provisioning.

use super::merge_labels;
use crate::compose::NetworkSpec;
use crate::error::{BerthError, PlatformError, Result};
use crate::naming::{self, Role};
use crate::platform::{ContainerPlatform, NetworkCreate};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Creates stack networks.
pub struct NetworkProvisioner {
    platform: Arc<dyn ContainerPlatform>,
}

impl NetworkProvisioner {
    pub fn new(platform: Arc<dyn ContainerPlatform>) -> Self {
        Self { platform }
    }

    /// Ensure the network `{stack}_{key}` exists and return its name.
    #[instrument(skip(self, spec))]
    pub async fn ensure(&self, stack: &str, key: &str, spec: &NetworkSpec) -> Result<String> {
        let name = naming::network_name(stack, key);
        let request = NetworkCreate {
            name: name.clone(),
            driver: spec.driver.clone(),
            labels: merge_labels(&spec.labels, naming::labels_for(stack, Role::Network, key)),
        };

        match self.platform.create_network(&request).await {
            Ok(()) => info!(network = %name, "Created network"),
            Err(PlatformError::Conflict(_)) => debug!(network = %name, "Network already exists"),
            Err(e) => {
                return Err(BerthError::platform("create_network", e)
                    .with_hint(format!("check that driver '{}' is available", driver_name(spec))))
            }
        }

        Ok(name)
    }
}

fn driver_name(spec: &NetworkSpec) -> &str {
    spec.driver.as_deref().unwrap_or("bridge")
}
