use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use exposr_core::{FeedbackType, validate_analysis_id};
use tracing::error;

use super::AppState;
use super::schemas::{ErrorResponse, FeedbackRequest, FeedbackResponse};
use crate::error::ServerError;

/// `POST /api/feedback` -- record a thumbs up/down on an analysis.
#[utoipa::path(
    post,
    path = "/api/feedback",
    tag = "Feedback",
    summary = "Submit feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback stored", body = FeedbackResponse),
        (status = 400, description = "Invalid analysis id or feedback type", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, ServerError> {
    let Json(req) = body.map_err(|e| {
        ServerError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    validate_analysis_id(&req.analysis_id)
        .map_err(|_| ServerError::BadRequest("Invalid analysis ID".to_owned()))?;
    let feedback_type: FeedbackType = req.feedback_type.parse().map_err(|_| {
        ServerError::BadRequest("Feedback type must be \"accurate\" or \"inaccurate\"".to_owned())
    })?;

    let record = state
        .repository
        .record_feedback(&req.analysis_id, feedback_type, req.comment.as_deref())
        .await
        .map_err(|e| {
            error!(analysis_id = %req.analysis_id, error = %e, "failed to store feedback");
            ServerError::Internal("Failed to submit feedback".to_owned())
        })?;

    Ok(Json(FeedbackResponse {
        success: true,
        data: record,
    }))
}
