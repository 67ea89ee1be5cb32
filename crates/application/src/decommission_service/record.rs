use super::*;

impl DecommissionService {
    /// Persists the batch in one store call with per-row merge semantics.
    ///
    /// Runs only after every machine in the batch was processed, and an
    /// empty batch skips the store entirely. A write failure is surfaced
    /// to the caller: machines are already deallocated and locked at this
    /// point, and a silent success would leave them unaccounted for.
    pub(super) async fn record_batch(&self, rows: &[AuditRow]) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.audit_table
            .upsert_merge(rows)
            .await
            .map_err(|error| match error {
                AppError::Credential(_) | AppError::AuditWrite(_) => error,
                other => AppError::AuditWrite(other.to_string()),
            })
    }
}
