//! Exposr HTTP Client
//!
//! A native Rust client for the Exposr image analysis service.
//!
//! [`ExposrClient`] is a thin typed wrapper over the REST API. On top of it,
//! [`AnalysisClient`] adds local validation, compression and the simulated
//! fallback, and [`AnalysisFlow`] drives one upload through the
//! presentation and feedback lifecycle.
//!
//! # Quick Start
//!
//! ```no_run
//! use exposr_client::{AnalysisClient, ExposrClient};
//! use exposr_core::{ConsentFlags, ImageUpload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), exposr_client::ClientError> {
//!     let api = ExposrClient::new("http://localhost:3001")?;
//!     let client = AnalysisClient::new(api);
//!
//!     let upload = ImageUpload::new("photo.jpg", "image/jpeg", std::fs::read("photo.jpg").unwrap());
//!     let result = client.analyze_image(upload, &ConsentFlags::new()).await?;
//!     println!("{} ({}%)", result.verdict, result.confidence);
//!     println!("keep this to delete your data: {}", result.delete_code);
//!     Ok(())
//! }
//! ```

mod analysis;
mod error;
mod flow;
mod pacer;

pub use analysis::AnalysisClient;
pub use error::ClientError;
pub use flow::AnalysisFlow;
pub use pacer::{DEFAULT_MIN_INTERVAL, Pacer};

use std::sync::Arc;
use std::time::Duration;

use exposr_core::{
    AnalysisResult, ConsentFlags, DashboardStats, FeedbackRecord, FeedbackType, ImageUpload,
    PublicAnalysis,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Default request timeout, matching the server's analysis bound.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the Exposr API.
///
/// Every request first waits on the client's [`Pacer`]; clones share it.
#[derive(Debug, Clone)]
pub struct ExposrClient {
    client: Client,
    base_url: String,
    pacer: Arc<Pacer>,
}

/// Builder for configuring an [`ExposrClient`].
#[derive(Debug)]
pub struct ExposrClientBuilder {
    base_url: String,
    timeout: Duration,
    min_interval: Duration,
    client: Option<Client>,
}

impl ExposrClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum spacing between requests. Zero disables pacing.
    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Use a custom reqwest Client. The configured timeout is ignored.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<ExposrClient, ClientError> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| ClientError::Configuration(e.to_string()))?,
        };

        Ok(ExposrClient {
            client,
            base_url: self.base_url,
            pacer: Arc::new(Pacer::new(self.min_interval)),
        })
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

/// A successful admin login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminToken {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ExposrClient {
    /// Create a client with default configuration.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        ExposrClientBuilder::new(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ExposrClientBuilder {
        ExposrClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        self.pacer.wait().await;
        request
            .send()
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))
    }

    // =========================================================================
    // Health
    // =========================================================================

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.send(self.client.get(self.url("/api/health"))).await?;
        read_json(response).await
    }

    // =========================================================================
    // Analysis
    // =========================================================================

    /// Upload `upload` for analysis.
    ///
    /// The server stores the image only when `consent` grants
    /// `research_training`. The returned delete code is never shown again.
    pub async fn analyze(
        &self,
        upload: &ImageUpload,
        consent: &ConsentFlags,
    ) -> Result<AnalysisResult, ClientError> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| ClientError::Configuration(format!("invalid content type: {e}")))?;
        let form = Form::new()
            .part("image", part)
            .text("consent", consent.to_json());

        let response = self
            .send(self.client.post(self.url("/api/analyze")).multipart(form))
            .await?;
        read_json::<Envelope<AnalysisResult>>(response)
            .await
            .map(|e| e.data)
    }

    /// Fetch the public view of a stored analysis.
    pub async fn get_analysis(&self, analysis_id: &str) -> Result<PublicAnalysis, ClientError> {
        let url = self.url(&format!("/api/analysis/{}", encode(analysis_id)));
        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::RecordNotFound);
        }
        read_json::<Envelope<PublicAnalysis>>(response)
            .await
            .map(|e| e.data)
    }

    /// Delete a stored analysis by id, proving ownership with its code.
    pub async fn delete_analysis(
        &self,
        analysis_id: &str,
        delete_code: &str,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/analysis/{}", encode(analysis_id)));
        let response = self
            .send(
                self.client
                    .delete(url)
                    .json(&json!({ "deleteCode": delete_code })),
            )
            .await?;
        read_delete(response).await
    }

    /// Delete whichever stored analysis `delete_code` was issued for.
    pub async fn delete_by_code(&self, delete_code: &str) -> Result<(), ClientError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/api/delete"))
                    .json(&json!({ "deleteCode": delete_code })),
            )
            .await?;
        read_delete(response).await
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    pub async fn submit_feedback(
        &self,
        analysis_id: &str,
        feedback_type: FeedbackType,
        comment: Option<&str>,
    ) -> Result<FeedbackRecord, ClientError> {
        let body = json!({
            "analysisId": analysis_id,
            "feedbackType": feedback_type.as_str(),
            "comment": comment,
        });
        let response = self
            .send(self.client.post(self.url("/api/feedback")).json(&body))
            .await?;
        read_json::<Envelope<FeedbackRecord>>(response)
            .await
            .map(|e| e.data)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub async fn admin_login(&self, password: &str) -> Result<AdminToken, ClientError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/api/admin/login"))
                    .json(&json!({ "password": password })),
            )
            .await?;
        read_json(response).await
    }

    pub async fn admin_dashboard(&self, token: &str) -> Result<DashboardStats, ClientError> {
        let response = self
            .send(
                self.client
                    .get(self.url("/api/admin/dashboard"))
                    .bearer_auth(token),
            )
            .await?;
        read_json::<Envelope<DashboardStats>>(response)
            .await
            .map(|e| e.data)
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Deserialization(e.to_string()))
}

async fn read_delete(response: Response) -> Result<(), ClientError> {
    match response.status() {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(ClientError::RecordNotFound),
        StatusCode::UNAUTHORIZED => Err(ClientError::InvalidDeleteCode),
        _ => Err(api_error(response).await),
    }
}

/// Turn a non-success response into [`ClientError::Api`], preferring the
/// server's `error` message over the status text.
async fn api_error(response: Response) -> ClientError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned(),
    };
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = ExposrClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
    }

    #[test]
    fn builder_configures_pacing() {
        let client = ExposrClient::builder("http://localhost:3001")
            .min_interval(Duration::from_millis(50))
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.pacer.interval(), Duration::from_millis(50));

        let default = ExposrClient::new("http://localhost:3001").unwrap();
        assert_eq!(default.pacer.interval(), DEFAULT_MIN_INTERVAL);
    }

    #[test]
    fn clones_share_the_pacer() {
        let client = ExposrClient::new("http://localhost:3001").unwrap();
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.pacer, &clone.pacer));
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(encode("abc123"), "abc123");
        assert_eq!(encode("a/b c"), "a%2Fb%20c");
    }
}
