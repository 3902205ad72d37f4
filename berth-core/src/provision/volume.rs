//! Volume provisioning.

use super::merge_labels;
use crate::compose::VolumeSpec;
use crate::error::{BerthError, PlatformError, Result};
use crate::naming::{self, Role};
use crate::platform::{ContainerPlatform, VolumeCreate};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Creates stack volumes.
pub struct VolumeProvisioner {
    platform: Arc<dyn ContainerPlatform>,
}

impl VolumeProvisioner {
    pub fn new(platform: Arc<dyn ContainerPlatform>) -> Self {
        Self { platform }
    }

    /// Ensure the volume `{stack}_{key}` exists and return its name.
    #[instrument(skip(self, spec))]
    pub async fn ensure(&self, stack: &str, key: &str, spec: &VolumeSpec) -> Result<String> {
        let name = naming::volume_name(stack, key);
        let request = VolumeCreate {
            name: name.clone(),
            driver: spec.driver.clone(),
            driver_opts: spec.driver_opts.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            labels: merge_labels(&spec.labels, naming::labels_for(stack, Role::Volume, key)),
        };

        match self.platform.create_volume(&request).await {
            Ok(()) => info!(volume = %name, "Created volume"),
            Err(PlatformError::Conflict(_)) => debug!(volume = %name, "Volume already exists"),
            Err(e) => {
                return Err(BerthError::platform("create_volume", e)
                    .with_hint("check the volume driver and its options"))
            }
        }

        Ok(name)
    }
}
