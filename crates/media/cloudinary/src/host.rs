use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use exposr_media::{MediaAsset, MediaError, MediaHost};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::config::CloudinaryConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    width: Option<u32>,
    height: Option<u32>,
    bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// [`MediaHost`] backed by the Cloudinary Upload API.
pub struct CloudinaryMediaHost {
    config: CloudinaryConfig,
    client: Client,
}

impl CloudinaryMediaHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        if config.cloud_name.trim().is_empty()
            || config.api_key.trim().is_empty()
            || config.api_secret.trim().is_empty()
        {
            return Err(MediaError::Configuration(
                "cloud name, API key and API secret are required".into(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MediaError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Use a caller-supplied HTTP client.
    pub fn with_client(config: CloudinaryConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    /// Request signature: parameters sorted by name, joined as `k=v` with
    /// `&`, secret appended, SHA-256 hex digest.
    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn map_send_error(&self, err: &reqwest::Error) -> MediaError {
        if err.is_timeout() {
            MediaError::Timeout(self.config.timeout)
        } else {
            MediaError::Connection(err.to_string())
        }
    }

    async fn error_from_response(response: reqwest::Response) -> MediaError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or(text);
        MediaError::Status { status, message }
    }
}

#[async_trait]
impl MediaHost for CloudinaryMediaHost {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "cloudinary"
    }

    #[instrument(skip(self, bytes), fields(public_id = %public_id, size = bytes.len()))]
    async fn upload(
        &self,
        public_id: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<MediaAsset, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("folder", self.config.folder.clone());
        params.insert("overwrite", "false".to_owned());
        params.insert("public_id", public_id.to_owned());
        params.insert("timestamp", timestamp);
        params.insert("transformation", self.config.transformation());
        let signature = self.sign(&params);

        let size = bytes.len() as u64;
        let file = Part::bytes(bytes.to_vec())
            .file_name(public_id.to_owned())
            .mime_str(content_type)
            .map_err(|e| MediaError::Configuration(format!("bad content type: {e}")))?;
        let mut form = Form::new().part("file", file);
        for (key, value) in params {
            form = form.text(key, value);
        }
        form = form
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        debug!(folder = %self.config.folder, "uploading image");
        let response = self
            .client
            .post(self.config.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!(error = %err, "image upload rejected");
            return Err(err);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;
        debug!(media_id = %body.public_id, "image uploaded");

        Ok(MediaAsset {
            public_id: body.public_id,
            secure_url: body.secure_url,
            width: body.width,
            height: body.height,
            bytes: body.bytes.or(Some(size)),
        })
    }

    #[instrument(skip(self), fields(media_id = %public_id))]
    async fn destroy(&self, public_id: &str) -> Result<bool, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_owned());
        params.insert("timestamp", timestamp);
        let signature = self.sign(&params);

        let mut fields: Vec<(&str, String)> = params.into_iter().collect();
        fields.push(("api_key", self.config.api_key.clone()));
        fields.push(("signature", signature));
        fields.push(("signature_algorithm", "sha256".to_owned()));
        let body = serde_urlencoded::to_string(&fields)
            .map_err(|e| MediaError::Configuration(e.to_string()))?;

        let response = self
            .client
            .post(self.config.endpoint("image/destroy"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;
        match body.result.as_str() {
            "ok" => Ok(true),
            "not found" => Ok(false),
            other => Err(MediaError::InvalidResponse(format!(
                "unexpected destroy result: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// Minimal HTTP server that answers one request with a canned body.
    struct MockCloudinary {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockCloudinary {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            Self {
                listener,
                base_url: format!("http://127.0.0.1:{port}"),
            }
        }

        /// Read one full request (headers plus `Content-Length` body), reply,
        /// and return the raw request text.
        async fn respond_once(self, status_code: u16, body: &str) -> String {
            let (mut stream, _) = self.listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = vec![0u8; 16384];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    fn host_for(base_url: &str) -> CloudinaryMediaHost {
        let config = CloudinaryConfig::new("demo", "key-123", "shh").with_base_url(base_url);
        CloudinaryMediaHost::new(config).unwrap()
    }

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        let host = host_for("http://localhost");
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_owned());
        params.insert("public_id", "sample_image".to_owned());

        let mut hasher = Sha256::new();
        hasher.update(b"public_id=sample_image&timestamp=1315060510shh");
        assert_eq!(host.sign(&params), hex::encode(hasher.finalize()));
    }

    #[test]
    fn missing_credentials_rejected() {
        let config = CloudinaryConfig::new("demo", "", "secret");
        assert!(matches!(
            CloudinaryMediaHost::new(config),
            Err(MediaError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn upload_sends_signed_multipart() {
        let server = MockCloudinary::start().await;
        let host = host_for(&server.base_url);
        let reply = r#"{"public_id":"exposr/abc123","secure_url":"https://res.cloudinary.com/demo/image/upload/exposr/abc123.jpg","width":800,"height":600,"bytes":4}"#;
        let handle = tokio::spawn(async move { server.respond_once(200, reply).await });

        let asset = host
            .upload("abc123", "image/jpeg", Bytes::from_static(b"\xFF\xD8\xFF\xE0"))
            .await
            .unwrap();
        let request = handle.await.unwrap();

        assert_eq!(asset.public_id, "exposr/abc123");
        assert_eq!(asset.width, Some(800));
        assert!(request.starts_with("POST /v1_1/demo/image/upload"));
        assert!(request.contains("name=\"folder\"\r\n\r\nexposr"));
        assert!(request.contains("name=\"public_id\"\r\n\r\nabc123"));
        assert!(request.contains("name=\"overwrite\"\r\n\r\nfalse"));
        assert!(request.contains("c_limit,w_1024,h_1024,q_auto"));
        assert!(request.contains("name=\"signature_algorithm\"\r\n\r\nsha256"));
        assert!(request.contains("name=\"api_key\"\r\n\r\nkey-123"));
        assert!(!request.contains("shh"));
    }

    #[tokio::test]
    async fn upload_error_message_extracted() {
        let server = MockCloudinary::start().await;
        let host = host_for(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_once(400, r#"{"error":{"message":"Invalid Signature"}}"#)
                .await
        });

        let err = host
            .upload("abc123", "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap_err();
        handle.await.unwrap();
        match err {
            MediaError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn destroy_reports_existence() {
        let server = MockCloudinary::start().await;
        let host = host_for(&server.base_url);
        let handle =
            tokio::spawn(async move { server.respond_once(200, r#"{"result":"ok"}"#).await });
        assert!(host.destroy("exposr/abc123").await.unwrap());
        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /v1_1/demo/image/destroy"));
        assert!(request.contains("public_id=exposr%2Fabc123"));

        let server = MockCloudinary::start().await;
        let host = host_for(&server.base_url);
        let handle = tokio::spawn(async move {
            server.respond_once(200, r#"{"result":"not found"}"#).await
        });
        assert!(!host.destroy("exposr/gone").await.unwrap());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_error() {
        let host = host_for("http://127.0.0.1:1");
        let err = host.destroy("x").await.unwrap_err();
        assert!(matches!(err, MediaError::Connection(_)));
    }
}
