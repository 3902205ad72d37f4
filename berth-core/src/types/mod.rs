//! Core domain types for berth.

pub mod stack;

// Re-exports
pub use stack::{
    DeploymentSummary, PortMapping, Protocol, ResourceDetail, ServiceDetail, ServiceInstance,
    Stack, StackDetails, StackStatus, TeardownCount, TeardownReport,
};
