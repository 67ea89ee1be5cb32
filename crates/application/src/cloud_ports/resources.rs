use async_trait::async_trait;
use mothball_core::AppResult;
use mothball_domain::{LockLevel, ResolvedVm};

/// Port for resource lookups and management locks.
///
/// Implementations report failures as
/// [`AppError::Provider`](mothball_core::AppError::Provider), or
/// [`AppError::Credential`](mothball_core::AppError::Credential) when token
/// acquisition is what failed; callers classify the error per pipeline stage.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Resolves one virtual machine to its live provider record.
    async fn get_virtual_machine(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<ResolvedVm>;

    /// Creates or updates the deletion-protection lock on `scope`.
    ///
    /// `scope` is the canonical resource id. Re-applying a lock with the
    /// same name on the same scope overwrites it, so repeat submissions of
    /// one change are safe.
    async fn apply_deletion_lock(
        &self,
        scope: &str,
        level: LockLevel,
        notes: &str,
    ) -> AppResult<()>;
}
