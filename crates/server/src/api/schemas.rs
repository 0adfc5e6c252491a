use exposr_core::{AnalysisResult, DashboardStats, FeedbackRecord, PublicAnalysis};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// RFC 3339 server time.
    #[schema(example = "2025-03-01T12:00:00.000Z")]
    pub timestamp: String,
    #[schema(example = "1.0.0")]
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Analysis not found")]
    pub error: String,
}

/// Multipart form accepted by `POST /api/analyze`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct AnalyzeForm {
    /// JPEG, PNG or WebP file.
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    /// JSON object of consent flags, e.g. `{"research_training":true}`.
    #[schema(example = r#"{"research_training":true}"#)]
    pub consent: Option<String>,
}

/// Successful analysis. `data.deleteCode` is returned only here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalysisResult,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    pub success: bool,
    pub data: PublicAnalysis,
}

/// Body of `DELETE /api/analysis/{analysisId}` and `POST /api/delete`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[schema(example = "9c1e5a7b3d2f4e6a8b0c1d2e")]
    #[serde(default)]
    pub delete_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    #[schema(example = "Analysis deleted successfully")]
    pub message: String,
}

/// Body of `POST /api/feedback`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[schema(example = "3f9a1c0e5b7d2468")]
    #[serde(default)]
    pub analysis_id: String,
    /// `accurate` or `inaccurate`.
    #[schema(example = "inaccurate")]
    #[serde(default)]
    pub feedback_type: String,
    /// Up to 500 characters; longer comments are truncated.
    #[schema(example = "The sky looks painted.")]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedbackResponse {
    pub success: bool,
    pub data: FeedbackRecord,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    /// Token lifetime in seconds.
    #[schema(example = 3600)]
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub success: bool,
    pub data: DashboardStats,
}
