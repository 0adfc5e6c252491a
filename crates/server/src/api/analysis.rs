use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use exposr_core::{validate_analysis_id, validate_delete_code};
use exposr_store::RepositoryError;
use tracing::{error, info};

use super::AppState;
use super::schemas::{AnalysisResponse, DeleteRequest, ErrorResponse, MessageResponse};
use crate::error::ServerError;

const DELETED_MESSAGE: &str = "Analysis deleted successfully";

/// `GET /api/analysis/{analysisId}` -- public view of a stored analysis.
#[utoipa::path(
    get,
    path = "/api/analysis/{analysis_id}",
    tag = "Analysis",
    summary = "Fetch a shared analysis",
    params(("analysis_id" = String, Path, description = "Analysis identifier")),
    responses(
        (status = 200, description = "Stored analysis", body = AnalysisResponse),
        (status = 400, description = "Malformed analysis id", body = ErrorResponse),
        (status = 404, description = "No stored analysis with this id", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> Result<Json<AnalysisResponse>, ServerError> {
    validate_analysis_id(&analysis_id)
        .map_err(|_| ServerError::BadRequest("Invalid analysis ID".to_owned()))?;

    let record = state
        .repository
        .lookup(&analysis_id)
        .await
        .map_err(|e| {
            error!(%analysis_id, error = %e, "failed to fetch analysis");
            ServerError::Internal("Failed to fetch analysis".to_owned())
        })?
        .ok_or_else(|| ServerError::NotFound("Analysis not found".to_owned()))?;

    Ok(Json(AnalysisResponse {
        success: true,
        data: record.public_view(),
    }))
}

/// `DELETE /api/analysis/{analysisId}` -- delete with the matching code.
#[utoipa::path(
    delete,
    path = "/api/analysis/{analysis_id}",
    tag = "Analysis",
    summary = "Delete an analysis",
    params(("analysis_id" = String, Path, description = "Analysis identifier")),
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Record and image deleted", body = MessageResponse),
        (status = 400, description = "Missing or malformed delete code", body = ErrorResponse),
        (status = 401, description = "Delete code does not match", body = ErrorResponse),
        (status = 404, description = "No stored analysis with this id", body = ErrorResponse)
    )
)]
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServerError> {
    validate_analysis_id(&analysis_id)
        .map_err(|_| ServerError::BadRequest("Invalid analysis ID".to_owned()))?;
    let code = delete_code(body)?;

    state
        .repository
        .delete_by_analysis(&analysis_id, &code)
        .await?;
    info!(%analysis_id, "analysis deleted on request");
    Ok(deleted())
}

/// `POST /api/delete` -- delete whichever analysis a code belongs to.
#[utoipa::path(
    post,
    path = "/api/delete",
    tag = "Analysis",
    summary = "Delete by code",
    description = "Deletes the stored analysis and image that a delete code was issued for, \
                   without knowing the analysis id.",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Record and image deleted", body = MessageResponse),
        (status = 400, description = "Missing or malformed delete code", body = ErrorResponse),
        (status = 404, description = "No analysis for this code", body = ErrorResponse)
    )
)]
pub async fn delete_by_code(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServerError> {
    let code = delete_code(body)?;
    let record = state.repository.delete_by_code(&code).await?;
    info!(analysis_id = %record.analysis_id, "analysis deleted by code");
    Ok(deleted())
}

/// Extract and format-check the delete code. A missing or unreadable body
/// counts as a missing code.
fn delete_code(body: Result<Json<DeleteRequest>, JsonRejection>) -> Result<String, ServerError> {
    let code = body
        .ok()
        .and_then(|Json(req)| req.delete_code)
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .ok_or(RepositoryError::MissingCode)?;
    validate_delete_code(&code)
        .map_err(|_| ServerError::BadRequest("Invalid delete code format".to_owned()))?;
    Ok(code)
}

fn deleted() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: DELETED_MESSAGE.to_owned(),
    })
}
