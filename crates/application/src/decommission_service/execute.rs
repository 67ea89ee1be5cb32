use super::*;

impl DecommissionService {
    /// Deallocates and locks each machine in order, collecting audit rows.
    ///
    /// The resource group for provider calls comes from the resolved
    /// canonical id, not from the caller's input. Both steps overwrite
    /// cleanly on repeat, so a failed batch is recovered by resubmitting
    /// the same change rather than rolling anything back. Every row in the
    /// batch carries the same request-processing timestamp.
    pub(super) async fn decommission_batch(
        &self,
        request: &DecommissionRequest,
        resolved: &[ResolvedVm],
    ) -> AppResult<Vec<AuditRow>> {
        let created_at = Utc::now();
        let mut rows = Vec::with_capacity(resolved.len());
        for vm in resolved {
            let group = vm
                .resource_group()
                .map_err(|error| error.into_step_failure(&vm.name))?;

            self.compute
                .begin_deallocate(&request.subscription_id, group, &vm.name)
                .await
                .map_err(|error| error.into_step_failure(&vm.name))?;

            let notes = format!("VM marked for removal. change: {}", request.change);
            self.resources
                .apply_deletion_lock(&vm.id, LockLevel::CannotDelete, &notes)
                .await
                .map_err(|error| error.into_step_failure(&vm.name))?;

            rows.push(AuditRow::new(
                &request.change,
                &vm.name,
                group,
                &request.subscription_id,
                created_at,
                request.days,
            )?);
            info!(
                vm = vm.name.as_str(),
                resource_group = group,
                "virtual machine deallocated and locked"
            );
        }
        Ok(rows)
    }
}
