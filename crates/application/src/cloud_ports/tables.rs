use async_trait::async_trait;
use mothball_core::AppResult;
use mothball_domain::AuditRow;

/// Port for the durable audit table.
#[async_trait]
pub trait AuditTableStore: Send + Sync {
    /// Merge-upserts every row, keyed by `(change, vm_name)`.
    ///
    /// Merge semantics: an existing row for the same key keeps properties
    /// the new row does not carry, and rewritten properties take the new
    /// values. Resubmitting a change therefore refreshes its rows instead
    /// of duplicating them.
    async fn upsert_merge(&self, rows: &[AuditRow]) -> AppResult<()>;
}
