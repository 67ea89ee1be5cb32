use super::*;

impl DecommissionService {
    /// Resolves every reference in request order, failing fast.
    ///
    /// Resolution runs before any destructive call, so a machine that
    /// cannot be found aborts the batch with the provider untouched.
    pub(super) async fn resolve_batch(
        &self,
        request: &DecommissionRequest,
    ) -> AppResult<Vec<ResolvedVm>> {
        let mut resolved = Vec::with_capacity(request.vm_list.len());
        for vm_ref in &request.vm_list {
            let vm = self
                .resources
                .get_virtual_machine(&request.subscription_id, &vm_ref.resource_group, &vm_ref.name)
                .await
                .map_err(|error| error.into_lookup_failure(&vm_ref.name))?;
            resolved.push(vm);
        }
        Ok(resolved)
    }
}
