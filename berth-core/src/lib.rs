//! Berth Core Library
//!
//! Deploys multi-service stacks described by Compose documents onto a container
//! platform, and tears them down again. Stack membership is recorded only as
//! labels on platform resources, so every query reflects live platform state.

pub mod compose;
pub mod config;
pub mod error;
pub mod inspector;
pub mod lease;
pub mod naming;
pub mod observability;
pub mod orchestrator;
pub mod platform;
pub mod provision;
pub mod types;

// Re-export commonly used items
pub use compose::{ComposeParser, StackDefinition};
pub use config::EngineConfig;
pub use error::{BerthError, PlatformError, Result};
pub use inspector::{StackInspector, StackResources};
pub use observability::init as init_observability;
pub use orchestrator::StackOrchestrator;
pub use platform::{ContainerPlatform, DockerPlatform, GuardedPlatform};
pub use types::{
    DeploymentSummary, PortMapping, Protocol, ServiceInstance, Stack, StackDetails, StackStatus,
    TeardownCount, TeardownReport,
};
