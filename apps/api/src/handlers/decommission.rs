use axum::Json;
use axum::extract::State;

use crate::dto::MessageResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Marks every machine named by the raw JSON body for removal.
///
/// The body is validated by the service rather than an extractor so that
/// shape problems surface through the pipeline's own error kinds.
pub async fn mark_for_removal_handler(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<MessageResponse>> {
    state.decommission_service.decommission(&body).await?;

    Ok(Json(MessageResponse {
        message: "OK!".to_owned(),
    }))
}
