use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mothball_core::AppResult;

/// Access token accepted by one provider audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    /// Opaque value placed on the Authorization header.
    pub secret: String,
    /// Instant after which the provider rejects the token.
    pub expires_at: DateTime<Utc>,
}

/// Port for acquiring provider access tokens.
///
/// One credential is built at startup and shared by every adapter, so a
/// cached token is reused process-wide until it nears expiry. Failures are
/// reported as [`AppError::Credential`](mothball_core::AppError::Credential).
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Returns a token valid for the audience named by `scope`.
    async fn bearer_token(&self, scope: &str) -> AppResult<BearerToken>;
}
