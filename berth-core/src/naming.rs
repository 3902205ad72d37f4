//! Deterministic resource naming and labeling.
//!
//! Every resource a stack owns is named from the stack name and its compose key,
//! and carries the project label plus one role label. Discovery, stop and remove
//! rely on these labels alone.

use crate::error::{BerthError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Label whose value is the stack name.
pub const LABEL_PROJECT: &str = "com.docker.compose.project";

/// Role label for containers; value is the service key.
pub const LABEL_SERVICE: &str = "com.docker.compose.service";

/// Role label for networks; value is the network key.
pub const LABEL_NETWORK: &str = "com.docker.compose.network";

/// Role label for volumes; value is the volume key.
pub const LABEL_VOLUME: &str = "com.docker.compose.volume";

/// Replica index used in container names. Services never scale past one.
pub const REPLICA_INDEX: u32 = 1;

static STACK_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("Invalid stack name regex"));

/// Which compose section produced a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Service,
    Network,
    Volume,
}

impl Role {
    /// The role label key for this kind of resource.
    pub fn label(self) -> &'static str {
        match self {
            Role::Service => LABEL_SERVICE,
            Role::Network => LABEL_NETWORK,
            Role::Volume => LABEL_VOLUME,
        }
    }
}

/// Check a stack name against `^[a-z0-9][a-z0-9_-]*$`.
pub fn validate_stack_name(name: &str) -> Result<()> {
    if STACK_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(BerthError::InvalidStackName { name: name.to_string() })
    }
}

/// `{stack}_{key}`
pub fn network_name(stack: &str, key: &str) -> String {
    format!("{}_{}", stack, key)
}

/// `{stack}_{key}`
pub fn volume_name(stack: &str, key: &str) -> String {
    format!("{}_{}", stack, key)
}

/// `{stack}_{service}_1`
pub fn container_name(stack: &str, service: &str) -> String {
    format!("{}_{}_{}", stack, service, REPLICA_INDEX)
}

/// Temporary name for a stack container moved aside while its replacement is created.
pub fn displaced_container_name(container: &str) -> String {
    format!("{}_old", container)
}

/// Full label set for a resource: project label plus its role label.
pub fn labels_for(stack: &str, role: Role, key: &str) -> HashMap<String, String> {
    HashMap::from([
        (LABEL_PROJECT.to_string(), stack.to_string()),
        (role.label().to_string(), key.to_string()),
    ])
}

/// Recover the service key from a container name such as `myapp_web_1`.
///
/// Used when a container lacks the service role label.
pub fn service_key_from_container(stack: &str, container: &str) -> Option<String> {
    let name = container.trim_start_matches('/');
    let rest = name.strip_prefix(stack)?.strip_prefix('_')?;
    let key = rest.strip_suffix(&format!("_{}", REPLICA_INDEX))?;
    (!key.is_empty()).then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(network_name("myapp", "front"), "myapp_front");
        assert_eq!(volume_name("myapp", "data"), "myapp_data");
        assert_eq!(container_name("myapp", "web"), "myapp_web_1");
        assert_eq!(displaced_container_name("myapp_web_1"), "myapp_web_1_old");
    }

    #[test]
    fn test_labels() {
        let labels = labels_for("myapp", Role::Volume, "data");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[LABEL_PROJECT], "myapp");
        assert_eq!(labels[LABEL_VOLUME], "data");
    }

    #[test]
    fn test_stack_name_validation() {
        for ok in ["myapp", "0app", "my-app_2", "a"] {
            assert!(validate_stack_name(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "MyApp", "-app", "_app", "my app", "app.v2", "ümlaut"] {
            assert!(
                matches!(validate_stack_name(bad), Err(BerthError::InvalidStackName { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_service_key_from_container() {
        assert_eq!(service_key_from_container("myapp", "/myapp_web_1"), Some("web".to_string()));
        assert_eq!(
            service_key_from_container("myapp", "myapp_api_gw_1"),
            Some("api_gw".to_string())
        );
        assert_eq!(service_key_from_container("myapp", "other_web_1"), None);
        assert_eq!(service_key_from_container("myapp", "myapp__1"), None);
    }
}
