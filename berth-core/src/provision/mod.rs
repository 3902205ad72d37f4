//! Resource provisioners.
//!
//! Each provisioner creates one kind of platform resource for a stack, named and
//! labeled by [`crate::naming`]. Network and volume creation is idempotent: an
//! "already exists" conflict counts as success.

pub mod container;
pub mod network;
pub mod volume;

pub use container::{ContainerProvisioner, CreatedContainer};
pub use network::NetworkProvisioner;
pub use volume::VolumeProvisioner;

use crate::compose::Labels;
use std::collections::HashMap;

/// User labels from the definition, overlaid with the engine's own labels.
///
/// Engine labels win so a definition cannot detach a resource from its stack.
fn merge_labels(user: &Labels, engine: HashMap<String, String>) -> HashMap<String, String> {
    let mut labels: HashMap<String, String> = user.to_pairs().into_iter().collect();
    labels.extend(engine);
    labels
}
