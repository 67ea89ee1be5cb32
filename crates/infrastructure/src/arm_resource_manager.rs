use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use mothball_application::{ResourceManager, TokenCredential};
use mothball_core::{AppError, AppResult};
use mothball_domain::{LockLevel, ResolvedVm};

/// Scope requested for Resource Manager tokens.
pub(crate) const ARM_TOKEN_SCOPE: &str = "https://management.azure.com/.default";

const VM_API_VERSION: &str = "2024-07-01";
const LOCK_API_VERSION: &str = "2016-09-01";

/// Name under which the deletion lock is created on each machine. Reusing
/// one name makes repeat submissions overwrite the lock instead of piling
/// up new ones.
const LOCK_NAME: &str = "DeallocationLock";

/// Resource Manager adapter for machine lookups and management locks.
pub struct ArmResourceManager {
    http_client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    base_url: String,
}

#[derive(Deserialize)]
struct VirtualMachineResponse {
    id: String,
    name: String,
}

impl ArmResourceManager {
    /// Creates an adapter against one Resource Manager endpoint.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        base_url: &str,
    ) -> Self {
        Self {
            http_client,
            credential,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn vm_url(&self, subscription_id: &str, resource_group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}?api-version={VM_API_VERSION}",
            self.base_url
        )
    }

    fn lock_url(&self, scope: &str) -> String {
        format!(
            "{}{scope}/providers/Microsoft.Authorization/locks/{LOCK_NAME}?api-version={LOCK_API_VERSION}",
            self.base_url
        )
    }
}

fn lock_body(level: LockLevel, notes: &str) -> Value {
    json!({
        "properties": {
            "level": level.as_str(),
            "notes": notes,
        }
    })
}

#[async_trait]
impl ResourceManager for ArmResourceManager {
    async fn get_virtual_machine(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<ResolvedVm> {
        let token = self.credential.bearer_token(ARM_TOKEN_SCOPE).await?;
        let response = self
            .http_client
            .get(self.vm_url(subscription_id, resource_group, name))
            .bearer_auth(&token.secret)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|error| {
                AppError::Provider(format!("virtual machine lookup failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Provider(format!(
                "virtual machine lookup returned status {status}: {body}"
            )));
        }

        let vm: VirtualMachineResponse = response.json().await.map_err(|error| {
            AppError::Provider(format!("virtual machine response is not valid JSON: {error}"))
        })?;
        Ok(ResolvedVm {
            id: vm.id,
            name: vm.name,
        })
    }

    async fn apply_deletion_lock(
        &self,
        scope: &str,
        level: LockLevel,
        notes: &str,
    ) -> AppResult<()> {
        let token = self.credential.bearer_token(ARM_TOKEN_SCOPE).await?;
        let response = self
            .http_client
            .put(self.lock_url(scope))
            .bearer_auth(&token.secret)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string())
            .json(&lock_body(level, notes))
            .send()
            .await
            .map_err(|error| AppError::Provider(format!("lock request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Provider(format!(
                "lock request returned status {status}: {body}"
            )));
        }
        debug!(scope, level = level.as_str(), "deletion lock applied");
        Ok(())
    }
}
