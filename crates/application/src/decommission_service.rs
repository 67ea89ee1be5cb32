use std::sync::Arc;

use chrono::Utc;
use mothball_core::{AppError, AppResult};
use mothball_domain::{AuditRow, DecommissionRequest, LockLevel, ResolvedVm};
use tracing::info;

use crate::cloud_ports::{AuditTableStore, ComputeLifecycle, ResourceManager};

mod execute;
mod record;
mod resolve;

/// Outcome of a completed decommission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecommissionSummary {
    /// Machines deallocated, locked, and recorded in the audit table.
    pub marked_for_removal: usize,
}

/// Service that marks batches of virtual machines for later removal.
///
/// Runs a strictly ordered pipeline: validate the raw request, resolve
/// every machine, deallocate and lock each one, then record the batch in
/// the audit table. The first failure anywhere aborts the remainder;
/// provider changes already applied stay in place and a resubmission of
/// the same change picks up where the failed run left off.
#[derive(Clone)]
pub struct DecommissionService {
    resources: Arc<dyn ResourceManager>,
    compute: Arc<dyn ComputeLifecycle>,
    audit_table: Arc<dyn AuditTableStore>,
}

impl DecommissionService {
    /// Creates a decommission service over the provider capabilities.
    #[must_use]
    pub fn new(
        resources: Arc<dyn ResourceManager>,
        compute: Arc<dyn ComputeLifecycle>,
        audit_table: Arc<dyn AuditTableStore>,
    ) -> Self {
        Self {
            resources,
            compute,
            audit_table,
        }
    }

    /// Marks every machine named by `raw_request` for removal.
    pub async fn decommission(&self, raw_request: &str) -> AppResult<DecommissionSummary> {
        let request = DecommissionRequest::parse(raw_request)?;
        info!(
            change = request.change.as_str(),
            machines = request.vm_list.len(),
            retention_days = request.days,
            "decommission request accepted"
        );

        let resolved = self.resolve_batch(&request).await?;
        let rows = self.decommission_batch(&request, &resolved).await?;
        self.record_batch(&rows).await?;

        info!(
            change = request.change.as_str(),
            marked = rows.len(),
            "decommission batch completed"
        );
        Ok(DecommissionSummary {
            marked_for_removal: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests;
