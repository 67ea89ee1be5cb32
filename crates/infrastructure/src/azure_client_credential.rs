use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use mothball_application::{BearerToken, TokenCredential};
use mothball_core::{AppError, AppResult};

/// Seconds subtracted from a token lifetime before it counts as expired.
const EXPIRY_MARGIN_SECONDS: i64 = 120;

/// Client-credentials flow against the Microsoft identity platform.
///
/// Tokens are cached per scope and reused until they near expiry, so the
/// adapters sharing one credential do not hit the token endpoint per call.
pub struct AzureClientCredential {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<HashMap<String, BearerToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl AzureClientCredential {
    /// Creates a credential for one tenant's token endpoint.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http_client,
            token_url: format!(
                "{}/{tenant_id}/oauth2/v2.0/token",
                authority.trim_end_matches('/')
            ),
            client_id,
            client_secret,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn request_token(&self, scope: &str) -> AppResult<BearerToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|error| AppError::Credential(format!("token request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Credential(format!(
                "token endpoint returned status {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|error| {
            AppError::Credential(format!("token response is not valid JSON: {error}"))
        })?;
        Ok(BearerToken {
            secret: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in.max(0)),
        })
    }
}

#[async_trait]
impl TokenCredential for AzureClientCredential {
    async fn bearer_token(&self, scope: &str) -> AppResult<BearerToken> {
        // The lock is held across the refresh so concurrent callers for the
        // same scope do not stampede the token endpoint.
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(scope) {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECONDS) > Utc::now() {
                return Ok(token.clone());
            }
        }
        let token = self.request_token(scope).await?;
        cache.insert(scope.to_owned(), token.clone());
        Ok(token)
    }
}
