//! Per-field validation of a parsed stack definition.
//!
//! Catches malformed entries before provisioning starts so they surface as
//! precise validation errors instead of opaque platform failures.

use super::entries::{MountEntry, MountSource, PortEntry};
use super::types::StackDefinition;
use crate::error::{BerthError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Compose keys (services, networks, volumes) end up inside resource names.
static KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("Invalid key regex"));

static RESTART_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(no|always|unless-stopped|on-failure(:[0-9]+)?)$")
        .expect("Invalid restart policy regex")
});

/// Validate every field the provisioners consume.
pub fn validate(definition: &StackDefinition) -> Result<()> {
    if definition.services.is_empty() {
        return Err(BerthError::validation("no services defined"));
    }

    for key in definition.networks.keys() {
        check_key("network", key)?;
    }
    for key in definition.volumes.keys() {
        check_key("volume", key)?;
    }

    for (name, service) in &definition.services {
        check_key("service", name)?;

        if service.image.trim().is_empty() {
            return Err(BerthError::validation(format!("service '{}' missing image", name)));
        }

        for port in &service.ports {
            PortEntry::parse(port).map_err(|reason| {
                BerthError::validation(format!("service '{}' port {}", name, reason))
            })?;
        }

        for volume in &service.volumes {
            let mount = MountEntry::parse(volume).map_err(|reason| {
                BerthError::validation(format!("service '{}' volume {}", name, reason))
            })?;

            if !mount.target.starts_with('/') {
                return Err(BerthError::validation(format!(
                    "service '{}' volume '{}' target must be an absolute path",
                    name, volume
                )));
            }

            if let MountSource::Named(source) = &mount.source {
                if !definition.volumes.contains_key(source) {
                    return Err(BerthError::validation(format!(
                        "service '{}' uses volume '{}' which is not declared \
                         under top-level 'volumes'",
                        name, source
                    )));
                }
            }
        }

        if let Some(command) = &service.command {
            command.to_args().map_err(|reason| {
                BerthError::validation(format!("service '{}' {}", name, reason))
            })?;
        }

        let restart = service.restart_policy();
        if !RESTART_REGEX.is_match(restart) {
            return Err(BerthError::validation(format!(
                "service '{}' has unknown restart policy '{}'",
                name, restart
            )));
        }
    }

    Ok(())
}

fn check_key(kind: &str, key: &str) -> Result<()> {
    if KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        Err(BerthError::validation(format!("invalid {} name '{}'", kind, key)))
    }
}
