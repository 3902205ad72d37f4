//! Deadlines and bounded retries around platform calls.

use super::{
    ContainerPlatform, ContainerSpec, ContainerSummary, NetworkCreate, NetworkSummary,
    PlatformResult, VolumeCreate, VolumeSummary,
};
use crate::config::EngineConfig;
use crate::error::PlatformError;
use crate::observability::metrics;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Wraps a platform so that no call can block forever.
///
/// Every call gets a deadline. Reads and teardown calls (list, inspect, stop,
/// remove) are retried on transient failures with linear backoff; creates,
/// starts and renames run exactly once.
pub struct GuardedPlatform<P> {
    inner: P,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl<P: ContainerPlatform> GuardedPlatform<P> {
    pub fn new(inner: P, timeout: Duration, max_retries: u32, backoff: Duration) -> Self {
        Self { inner, timeout, max_retries, backoff }
    }

    /// Build from engine configuration.
    pub fn from_config(inner: P, config: &EngineConfig) -> Self {
        Self::new(
            inner,
            Duration::from_secs(config.platform_timeout_secs),
            config.max_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, retry: bool, f: F) -> PlatformResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
    {
        let attempts = if retry { self.max_retries + 1 } else { 1 };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => {
                    metrics::record_platform_timeout(operation);
                    Err(PlatformError::Timeout { secs: self.timeout.as_secs() })
                }
            };

            match result {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(operation, attempt, error = %e, "Transient platform failure, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl<P: ContainerPlatform> ContainerPlatform for GuardedPlatform<P> {
    async fn list_containers(&self, all: bool) -> PlatformResult<Vec<ContainerSummary>> {
        self.call("list_containers", true, || self.inner.list_containers(all)).await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> PlatformResult<String> {
        self.call("create_container", false, || self.inner.create_container(spec)).await
    }

    async fn start_container(&self, id: &str) -> PlatformResult<()> {
        self.call("start_container", false, || self.inner.start_container(id)).await
    }

    async fn stop_container(&self, id: &str) -> PlatformResult<()> {
        self.call("stop_container", true, || self.inner.stop_container(id)).await
    }

    async fn remove_container(&self, id: &str) -> PlatformResult<()> {
        self.call("remove_container", true, || self.inner.remove_container(id)).await
    }

    async fn rename_container(&self, id: &str, name: &str) -> PlatformResult<()> {
        self.call("rename_container", false, || self.inner.rename_container(id, name)).await
    }

    async fn inspect_container(&self, id: &str) -> PlatformResult<ContainerSummary> {
        self.call("inspect_container", true, || self.inner.inspect_container(id)).await
    }

    async fn create_network(&self, spec: &NetworkCreate) -> PlatformResult<()> {
        self.call("create_network", false, || self.inner.create_network(spec)).await
    }

    async fn list_networks(&self) -> PlatformResult<Vec<NetworkSummary>> {
        self.call("list_networks", true, || self.inner.list_networks()).await
    }

    async fn remove_network(&self, name: &str) -> PlatformResult<()> {
        self.call("remove_network", true, || self.inner.remove_network(name)).await
    }

    async fn create_volume(&self, spec: &VolumeCreate) -> PlatformResult<()> {
        self.call("create_volume", false, || self.inner.create_volume(spec)).await
    }

    async fn list_volumes(&self) -> PlatformResult<Vec<VolumeSummary>> {
        self.call("list_volumes", true, || self.inner.list_volumes()).await
    }

    async fn remove_volume(&self, name: &str) -> PlatformResult<()> {
        self.call("remove_volume", true, || self.inner.remove_volume(name)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
