use chrono::{DateTime, Duration, Utc};
use mothball_core::{AppError, AppResult};

/// One persisted audit entry for a successfully decommissioned machine.
///
/// Row identity is `(change, vm_name)`: resubmitting the same change and
/// machine merges into the existing row instead of duplicating it. Rows are
/// only ever written after every machine in the batch has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    /// Change justification; the storage partition key.
    pub change: String,
    /// Provider-reported virtual machine name; the storage row key.
    pub vm_name: String,
    /// Resource group derived from the canonical resource id.
    pub resource_group: String,
    /// Subscription the machine was resolved in.
    pub subscription_id: String,
    /// When the pipeline processed the machine.
    pub created_at: DateTime<Utc>,
    /// When the machine becomes eligible for removal.
    pub remove_date: DateTime<Utc>,
}

impl AuditRow {
    /// Builds a row with `remove_date` computed as `created_at + days`.
    ///
    /// Retention values are not range-checked upstream, so windows beyond
    /// chrono's representable span surface here as a step failure for the
    /// machine instead of a panic.
    pub fn new(
        change: &str,
        vm_name: &str,
        resource_group: &str,
        subscription_id: &str,
        created_at: DateTime<Utc>,
        retention_days: i64,
    ) -> AppResult<Self> {
        let window = Duration::try_days(retention_days).ok_or_else(|| {
            AppError::DecommissionStep {
                name: vm_name.to_owned(),
                cause: format!("retention period of {retention_days} days is out of range"),
            }
        })?;
        let remove_date =
            created_at
                .checked_add_signed(window)
                .ok_or_else(|| AppError::DecommissionStep {
                    name: vm_name.to_owned(),
                    cause: format!(
                        "remove date for a {retention_days} day retention period is not representable"
                    ),
                })?;

        Ok(Self {
            change: change.to_owned(),
            vm_name: vm_name.to_owned(),
            resource_group: resource_group.to_owned(),
            subscription_id: subscription_id.to_owned(),
            created_at,
            remove_date,
        })
    }
}
