//! Shared primitives for all Rust crates in Mothball.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Mothball crates.
pub type AppResult<T> = Result<T, AppError>;

/// Failure kinds produced by the decommission pipeline.
///
/// The first three variants reject the request itself and map to a client
/// error at the HTTP boundary; the rest describe provider-side failures and
/// map to a server error. The pipeline stops at the first failure, so one of
/// these is the whole story of a failed request.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body was not a JSON object.
    #[error("malformed request body: {0}")]
    MalformedInput(String),

    /// A required request field is absent or has the wrong type.
    #[error("field '{field}' is required and must be {expected}")]
    MissingField {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },

    /// A `vmList` element is missing a name or resource group.
    #[error("vmList item {index} must carry a non-empty 'name' and a non-empty 'resourceGroup'")]
    InvalidListItem {
        /// Zero-based position of the offending element.
        index: usize,
    },

    /// Token acquisition for the provider failed.
    #[error("credential acquisition failed: {0}")]
    Credential(String),

    /// A virtual machine could not be resolved to a live resource.
    #[error("failed to look up virtual machine '{name}': {cause}")]
    ResourceLookup {
        /// Name of the virtual machine as submitted.
        name: String,
        /// Underlying provider error text.
        cause: String,
    },

    /// Deallocation or lock placement failed for one resource.
    #[error("failed to decommission virtual machine '{name}': {cause}")]
    DecommissionStep {
        /// Name of the virtual machine being processed.
        name: String,
        /// Underlying provider error text.
        cause: String,
    },

    /// The audit rows could not be written to the storage table.
    #[error("failed to record audit rows: {0}")]
    AuditWrite(String),

    /// A raw provider call failed before pipeline context was attached.
    #[error("provider call failed: {0}")]
    Provider(String),

    /// Process configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Process-level failure outside the decommission pipeline.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when the failure is a rejection of the request shape.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput(_) | Self::MissingField { .. } | Self::InvalidListItem { .. }
        )
    }

    /// Wraps a lookup failure with the submitted virtual machine name.
    ///
    /// Credential failures keep their own kind so the response still names
    /// the stage that actually failed.
    #[must_use]
    pub fn into_lookup_failure(self, vm_name: &str) -> Self {
        match self {
            Self::Credential(_) => self,
            other => Self::ResourceLookup {
                name: vm_name.to_owned(),
                cause: other.to_string(),
            },
        }
    }

    /// Wraps a deallocate or lock failure with the resource name.
    ///
    /// Credential failures keep their own kind, as with lookup wrapping.
    #[must_use]
    pub fn into_step_failure(self, vm_name: &str) -> Self {
        match self {
            Self::Credential(_) => self,
            other => Self::DecommissionStep {
                name: vm_name.to_owned(),
                cause: other.to_string(),
            },
        }
    }
}
