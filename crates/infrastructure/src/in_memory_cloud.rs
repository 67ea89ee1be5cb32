use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mothball_application::{AuditTableStore, ComputeLifecycle, ResourceManager};
use mothball_core::{AppError, AppResult};
use mothball_domain::{AuditRow, LockLevel, ResolvedVm};

/// In-memory provider implementing every cloud port.
///
/// Backs handler tests and local development; one instance is shared as
/// the resource, compute, and table capability at once.
#[derive(Default)]
pub struct InMemoryCloud {
    machines: Mutex<HashMap<(String, String, String), ResolvedVm>>,
    deallocated: Mutex<Vec<String>>,
    locks: Mutex<HashMap<String, (LockLevel, String)>>,
    rows: Mutex<HashMap<(String, String), AuditRow>>,
}

impl InMemoryCloud {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a machine so lookups for it resolve.
    pub async fn insert_machine(&self, subscription_id: &str, resource_group: &str, name: &str) {
        let id = format!(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}"
        );
        self.machines.lock().await.insert(
            (
                subscription_id.to_owned(),
                resource_group.to_owned(),
                name.to_owned(),
            ),
            ResolvedVm {
                id,
                name: name.to_owned(),
            },
        );
    }

    /// Names of machines deallocated so far, in call order.
    pub async fn deallocated_names(&self) -> Vec<String> {
        self.deallocated.lock().await.clone()
    }

    /// Lock level and notes applied at `scope`, if any.
    pub async fn lock_at(&self, scope: &str) -> Option<(LockLevel, String)> {
        self.locks.lock().await.get(scope).cloned()
    }

    /// All audit rows written so far.
    pub async fn audit_rows(&self) -> Vec<AuditRow> {
        self.rows.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl ResourceManager for InMemoryCloud {
    async fn get_virtual_machine(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<ResolvedVm> {
        self.machines
            .lock()
            .await
            .get(&(
                subscription_id.to_owned(),
                resource_group.to_owned(),
                name.to_owned(),
            ))
            .cloned()
            .ok_or_else(|| AppError::Provider(format!("virtual machine '{name}' was not found")))
    }

    async fn apply_deletion_lock(
        &self,
        scope: &str,
        level: LockLevel,
        notes: &str,
    ) -> AppResult<()> {
        self.locks
            .lock()
            .await
            .insert(scope.to_owned(), (level, notes.to_owned()));
        Ok(())
    }
}

#[async_trait]
impl ComputeLifecycle for InMemoryCloud {
    async fn begin_deallocate(
        &self,
        _subscription_id: &str,
        _resource_group: &str,
        name: &str,
    ) -> AppResult<()> {
        self.deallocated.lock().await.push(name.to_owned());
        Ok(())
    }
}

#[async_trait]
impl AuditTableStore for InMemoryCloud {
    async fn upsert_merge(&self, rows: &[AuditRow]) -> AppResult<()> {
        let mut stored = self.rows.lock().await;
        for row in rows {
            stored.insert((row.change.clone(), row.vm_name.clone()), row.clone());
        }
        Ok(())
    }
}
