#![allow(clippy::needless_for_each)]

use exposr_core::{
    AnalysisResult, DashboardStats, FeedbackRecord, FeedbackType, PublicAnalysis, Verdict,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

use super::schemas::{
    AnalysisResponse, AnalyzeForm, AnalyzeResponse, DashboardResponse, DeleteRequest,
    ErrorResponse, FeedbackRequest, FeedbackResponse, HealthResponse, LoginRequest, LoginResponse,
    MessageResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Exposr API",
        version = "1.0.0",
        description = "Upload an image, find out whether it looks AI-generated, share the result, \
                       leave feedback, and delete your data with the code you were given.",
        license(name = "Apache-2.0")
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Analysis", description = "Image analysis, sharing and deletion"),
        (name = "Feedback", description = "Accuracy feedback on analyses"),
        (name = "Admin", description = "Operator login and dashboard")
    ),
    paths(
        super::health::health,
        super::analyze::analyze,
        super::analysis::get_analysis,
        super::analysis::delete_analysis,
        super::analysis::delete_by_code,
        super::feedback::submit_feedback,
        super::admin::login,
        super::admin::dashboard,
    ),
    components(schemas(
        AnalysisResult, PublicAnalysis, Verdict, FeedbackRecord, FeedbackType, DashboardStats,
        HealthResponse, ErrorResponse, AnalyzeForm, AnalyzeResponse, AnalysisResponse,
        DeleteRequest, MessageResponse, FeedbackRequest, FeedbackResponse,
        LoginRequest, LoginResponse, DashboardResponse,
    ))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/health",
            "/api/analyze",
            "/api/analysis/{analysis_id}",
            "/api/delete",
            "/api/feedback",
            "/api/admin/login",
            "/api/admin/dashboard",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer"));
    }
}
