use axum::Json;
use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;
use chrono::Utc;
use exposr_core::{
    AnalysisResult, ConsentFlags, ImageUpload, generate_analysis_id, generate_delete_code,
};
use exposr_detector::DetectorError;
use exposr_intake::{IntakeError, probe_dimensions};
use tracing::{error, info, instrument, warn};

use super::schemas::{AnalyzeForm, AnalyzeResponse, ErrorResponse};
use super::{AppState, RequestContext};
use crate::error::ServerError;

const TIMEOUT_MESSAGE: &str = "Request timeout - analysis took too long";
const DETECTOR_FAILED_MESSAGE: &str = "AI analysis failed - please try again later";
const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed - please try again later";

/// `POST /api/analyze` -- validate, classify and (with consent) store one image.
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "Analysis",
    summary = "Analyze an image",
    description = "Classifies an uploaded image as AI-generated or human-created. The image is \
                   stored only when the `consent` field grants `research_training`. The returned \
                   `deleteCode` is shown once and never again.",
    request_body(content = AnalyzeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Analysis completed", body = AnalyzeResponse),
        (status = 400, description = "Missing, unsupported or malformed file", body = ErrorResponse),
        (status = 408, description = "Analysis timed out", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Analysis backend or storage failed", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn analyze(
    State(state): State<AppState>,
    RequestContext(context): RequestContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ServerError> {
    let limit = state.validator.max_file_size();
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "request is not a multipart upload");
        ServerError::from(IntakeError::Missing)
    })?;
    let (upload, consent) = read_form(&mut multipart, limit).await?;
    let upload = upload.ok_or(IntakeError::Missing)?;

    let kind = state.validator.validate(&upload)?;
    let (image_width, image_height) = probe_dimensions(&upload.bytes).unwrap_or_else(|| {
        warn!(filename = %upload.filename, "could not read image dimensions");
        (0, 0)
    });

    let timeout = state.settings.analysis_timeout;
    let detection = match tokio::time::timeout(timeout, state.detector.detect(&upload)).await {
        Ok(Ok(detection)) => detection,
        Ok(Err(DetectorError::Timeout(_))) | Err(_) => {
            warn!(backend = state.detector.name(), ?timeout, "analysis timed out");
            return Err(ServerError::Timeout(TIMEOUT_MESSAGE.to_owned()));
        }
        Ok(Err(e)) => {
            error!(backend = state.detector.name(), error = %e, "analysis backend failed");
            return Err(ServerError::Internal(DETECTOR_FAILED_MESSAGE.to_owned()));
        }
    };

    let result = AnalysisResult {
        analysis_id: generate_analysis_id(),
        filename: upload.filename.clone(),
        confidence: detection.confidence,
        verdict: detection.verdict,
        is_ai: detection.is_ai,
        timestamp: Utc::now(),
        file_format: kind.label().to_owned(),
        image_width,
        image_height,
        file_size_kb: upload.size_kb(),
        delete_code: generate_delete_code(),
        explanation: detection.explanation,
        evidence: detection.evidence,
        detection_details: detection.raw,
        fallback: false,
    };

    match state
        .repository
        .persist(&result, &upload, &consent, &context)
        .await
    {
        Ok(outcome) => info!(
            analysis_id = %result.analysis_id,
            verdict = %result.verdict,
            confidence = result.confidence,
            stored = outcome.is_stored(),
            "analysis completed"
        ),
        Err(e) => {
            error!(analysis_id = %result.analysis_id, error = %e, "failed to persist analysis");
            return Err(ServerError::Internal(ANALYSIS_FAILED_MESSAGE.to_owned()));
        }
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        data: result,
    }))
}

/// Pull the `image` file and `consent` field out of the form. Unknown fields
/// are skipped; unparseable consent reads as no consent.
async fn read_form(
    multipart: &mut Multipart,
    limit: usize,
) -> Result<(Option<ImageUpload>, ConsentFlags), ServerError> {
    let mut upload = None;
    let mut consent = ConsentFlags::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        match field.name() {
            Some("image") => {
                if upload.is_some() {
                    return Err(ServerError::BadRequest(
                        "Only one image may be uploaded per request".to_owned(),
                    ));
                }
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e, limit))?;
                upload = Some(ImageUpload::new(filename, content_type, bytes));
            }
            Some("consent") => {
                let raw = field.text().await.map_err(|e| multipart_error(&e, limit))?;
                consent = ConsentFlags::from_json(&raw).unwrap_or_else(|e| {
                    warn!(error = %e, "could not parse consent, defaulting to no consent");
                    ConsentFlags::new()
                });
            }
            _ => {}
        }
    }
    Ok((upload, consent))
}

fn multipart_error(err: &MultipartError, limit: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return IntakeError::TooLarge { size: limit + 1, limit }.into();
    }
    warn!(error = %err, "malformed multipart body");
    ServerError::BadRequest("Malformed upload".to_owned())
}
