use async_trait::async_trait;
use mothball_core::AppResult;

/// Port for compute lifecycle control.
#[async_trait]
pub trait ComputeLifecycle: Send + Sync {
    /// Asks the provider to stop the machine and release its compute.
    ///
    /// Ok means the provider accepted the request, not that deallocation
    /// finished. The machine definition and disks are kept either way, so
    /// a deallocated machine can still be started again later.
    async fn begin_deallocate(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<()>;
}
