use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use mothball_application::{ComputeLifecycle, TokenCredential};
use mothball_core::{AppError, AppResult};

use crate::arm_resource_manager::ARM_TOKEN_SCOPE;

const DEALLOCATE_API_VERSION: &str = "2024-07-01";

/// Resource Manager adapter for the compute deallocate operation.
///
/// Deallocation is long-running on the provider side; this adapter only
/// confirms the request was accepted and never polls for completion.
pub struct ArmComputeLifecycle {
    http_client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    base_url: String,
}

impl ArmComputeLifecycle {
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

    fn deallocate_url(&self, subscription_id: &str, resource_group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}/deallocate?api-version={DEALLOCATE_API_VERSION}",
            self.base_url
        )
    }
}

#[async_trait]
impl ComputeLifecycle for ArmComputeLifecycle {
    async fn begin_deallocate(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> AppResult<()> {
        let token = self.credential.bearer_token(ARM_TOKEN_SCOPE).await?;
        let response = self
            .http_client
            .post(self.deallocate_url(subscription_id, resource_group, name))
            .bearer_auth(&token.secret)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|error| AppError::Provider(format!("deallocate request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Provider(format!(
                "deallocate request returned status {status}: {body}"
            )));
        }
        debug!(vm = name, resource_group, "deallocate accepted");
        Ok(())
    }
}
