use serde::Serialize;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Acknowledgement payload for an accepted decommission request.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
