use async_trait::async_trait;
use exposr_core::{FeedbackRecord, StoredRecord};
use exposr_store::{RecordStore, StoreError};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::AirtableConfig;
use crate::fields::{
    self, DELETE_CODE_DIGEST, analysis_fields, analysis_from_fields, equals_formula,
    feedback_fields, feedback_from_fields,
};

/// Page size for list requests; Airtable's maximum.
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

/// [`RecordStore`] backed by the Airtable REST API.
pub struct AirtableRecordStore {
    config: AirtableConfig,
    client: Client,
}

impl AirtableRecordStore {
    pub fn new(config: AirtableConfig) -> Result<Self, StoreError> {
        if config.api_key.trim().is_empty() || config.base_id.trim().is_empty() {
            return Err(StoreError::Configuration(
                "Airtable API key and base id are required".into(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn with_client(config: AirtableConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/v0/{}/{}",
            self.config.base_url,
            utf8_percent_encode(&self.config.base_id, NON_ALPHANUMERIC),
            utf8_percent_encode(table, NON_ALPHANUMERIC),
        )
    }

    fn map_send_error(&self, err: &reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.config.timeout())
        } else {
            StoreError::Connection(err.to_string())
        }
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                let err = v.get("error")?;
                err.get("message")
                    .or(Some(err))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or(body);
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_page(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<ListResponse, StoreError> {
        let query = serde_urlencoded::to_string(params)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let url = format!("{}?{query}", self.table_url(table));
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    /// First record in `table` matching `formula`.
    async fn find_first(
        &self,
        table: &str,
        formula: &str,
    ) -> Result<Option<AirtableRecord>, StoreError> {
        let page = self
            .get_page(table, &[("filterByFormula", formula), ("maxRecords", "1")])
            .await?;
        Ok(page.records.into_iter().next())
    }

    /// Every record in `table`, following `offset` pagination.
    async fn list_all(&self, table: &str) -> Result<Vec<AirtableRecord>, StoreError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let page = match offset.as_deref() {
                Some(o) => {
                    self.get_page(table, &[("pageSize", PAGE_SIZE), ("offset", o)])
                        .await?
                }
                None => self.get_page(table, &[("pageSize", PAGE_SIZE)]).await?,
            };
            records.extend(page.records);
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        debug!(table, count = records.len(), "listed records");
        Ok(records)
    }

    async fn create(&self, table: &str, body: &Value) -> Result<AirtableRecord, StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for AirtableRecordStore {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "airtable"
    }

    #[instrument(skip(self, record), fields(analysis_id = %record.analysis_id))]
    async fn create_analysis(&self, record: &StoredRecord) -> Result<StoredRecord, StoreError> {
        let created = self
            .create(&self.config.analyses_table, &analysis_fields(record))
            .await?;
        debug!(record_id = %created.id, "analysis row created");
        let mut stored = record.clone();
        stored.record_id = created.id;
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find_analysis(&self, analysis_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let formula = equals_formula(fields::ANALYSIS_ID, analysis_id);
        self.find_first(&self.config.analyses_table, &formula)
            .await?
            .map(|r| analysis_from_fields(&r.id, &r.fields))
            .transpose()
    }

    #[instrument(skip_all)]
    async fn find_by_delete_digest(
        &self,
        digest: &str,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let formula = equals_formula(DELETE_CODE_DIGEST, digest);
        self.find_first(&self.config.analyses_table, &formula)
            .await?
            .map(|r| analysis_from_fields(&r.id, &r.fields))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn delete_analysis(&self, record_id: &str) -> Result<bool, StoreError> {
        let url = format!(
            "{}/{}",
            self.table_url(&self.config.analyses_table),
            utf8_percent_encode(record_id, NON_ALPHANUMERIC)
        );
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }

    #[instrument(skip(self, feedback), fields(analysis_id = %feedback.analysis_id))]
    async fn create_feedback(&self, feedback: &FeedbackRecord) -> Result<(), StoreError> {
        self.create(&self.config.feedback_table, &feedback_fields(feedback))
            .await?;
        Ok(())
    }

    async fn list_analyses(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.list_all(&self.config.analyses_table).await?;
        let mut out = Vec::with_capacity(records.len());
        for r in records {
            match analysis_from_fields(&r.id, &r.fields) {
                Ok(record) => out.push(record),
                Err(e) => warn!(record_id = %r.id, error = %e, "skipping unreadable analysis row"),
            }
        }
        Ok(out)
    }

    async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>, StoreError> {
        let records = self.list_all(&self.config.feedback_table).await?;
        let mut out = Vec::with_capacity(records.len());
        for r in records {
            match feedback_from_fields(&r.fields) {
                Ok(feedback) => out.push(feedback),
                Err(e) => warn!(record_id = %r.id, error = %e, "skipping unreadable feedback row"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    /// Minimal HTTP server that answers successive connections with canned
    /// responses and hands back the request heads it saw.
    struct MockAirtable {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockAirtable {
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

        async fn respond_sequence(self, responses: Vec<(u16, String)>) -> Vec<String> {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = self.listener.accept().await.unwrap();
                let mut buf = vec![0u8; 16384];
                let n = stream.read(&mut buf).await.unwrap();
                seen.push(String::from_utf8_lossy(&buf[..n]).into_owned());

                let response = format!(
                    "HTTP/1.1 {status} OK\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\
                     \r\n\
                     {body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
            seen
        }
    }

    fn store_for(base_url: &str) -> AirtableRecordStore {
        let config = AirtableConfig::new("pat-test", "appBase1").with_base_url(base_url);
        AirtableRecordStore::new(config).unwrap()
    }

    fn analysis_row(id: &str, analysis_id: &str) -> String {
        format!(
            r#"{{"id":"{id}","fields":{{"Analysis_ID":"{analysis_id}","Filename":"a.jpg","Confidence":88,"Verdict":"AI-Generated","AI_Detected":true,"Timestamp":"2025-01-02T03:04:05.000Z","File_Format":"JPEG","Image_Width":10,"Image_Height":20,"File_Size_KB":3,"Delete_Code_Digest":"abcd"}}}}"#
        )
    }

    #[test]
    fn requires_credentials() {
        assert!(matches!(
            AirtableRecordStore::new(AirtableConfig::new("", "app")),
            Err(StoreError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn find_analysis_uses_formula_and_limit() {
        let server = MockAirtable::start().await;
        let store = store_for(&server.base_url);
        let body = format!(r#"{{"records":[{}]}}"#, analysis_row("rec1", "feedface00000000"));
        let handle = tokio::spawn(async move { server.respond_sequence(vec![(200, body)]).await });

        let found = store.find_analysis("feedface00000000").await.unwrap().unwrap();
        let requests = handle.await.unwrap();

        assert_eq!(found.record_id, "rec1");
        assert!(found.is_ai);
        assert_eq!(found.confidence, 88);
        assert!(requests[0].starts_with("GET /v0/appBase1/Analyses?"));
        assert!(requests[0].contains("filterByFormula=%7BAnalysis_ID%7D%3D%27feedface00000000%27"));
        assert!(requests[0].contains("maxRecords=1"));
        assert!(requests[0].contains("authorization: Bearer pat-test"));
    }

    #[tokio::test]
    async fn find_returns_none_for_empty_page() {
        let server = MockAirtable::start().await;
        let store = store_for(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_sequence(vec![(200, r#"{"records":[]}"#.to_owned())])
                .await
        });
        assert!(store.find_by_delete_digest("00").await.unwrap().is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn list_follows_offset_pagination() {
        let server = MockAirtable::start().await;
        let store = store_for(&server.base_url);
        let first = format!(
            r#"{{"records":[{}],"offset":"itrNext/rec1"}}"#,
            analysis_row("rec1", "aaaaaaaaaaaaaaaa")
        );
        let second = format!(r#"{{"records":[{}]}}"#, analysis_row("rec2", "bbbbbbbbbbbbbbbb"));
        let handle = tokio::spawn(async move {
            server
                .respond_sequence(vec![(200, first), (200, second)])
                .await
        });

        let all = store.list_analyses().await.unwrap();
        let requests = handle.await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[1].record_id, "rec2");
        assert!(requests[1].contains("offset=itrNext%2Frec1"));
    }

    #[tokio::test]
    async fn create_returns_record_id() {
        let server = MockAirtable::start().await;
        let store = store_for(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_sequence(vec![(200, analysis_row("recNew", "cccccccccccccccc"))])
                .await
        });

        let record = StoredRecord {
            record_id: String::new(),
            analysis_id: "cccccccccccccccc".into(),
            filename: "a.jpg".into(),
            confidence: 88,
            verdict: exposr_core::Verdict::AiGenerated,
            is_ai: true,
            timestamp: chrono::Utc::now(),
            file_format: "JPEG".into(),
            image_width: 10,
            image_height: 20,
            file_size_kb: 3,
            delete_code_digest: "abcd".into(),
            media_id: None,
            image_url: None,
            research_consent: true,
            country: None,
            region: None,
            encrypted_context: None,
        };
        let stored = store.create_analysis(&record).await.unwrap();
        let requests = handle.await.unwrap();
        assert_eq!(stored.record_id, "recNew");
        assert!(requests[0].starts_with("POST /v0/appBase1/Analyses "));
    }

    #[tokio::test]
    async fn delete_maps_not_found_and_errors() {
        let server = MockAirtable::start().await;
        let store = store_for(&server.base_url);
        let handle = tokio::spawn(async move {
            server
                .respond_sequence(vec![
                    (200, r#"{"id":"rec1","deleted":true}"#.to_owned()),
                    (404, r#"{"error":"NOT_FOUND"}"#.to_owned()),
                    (
                        422,
                        r#"{"error":{"type":"INVALID_REQUEST","message":"bad id"}}"#.to_owned(),
                    ),
                ])
                .await
        });

        assert!(store.delete_analysis("rec1").await.unwrap());
        assert!(!store.delete_analysis("rec1").await.unwrap());
        match store.delete_analysis("???").await.unwrap_err() {
            StoreError::Status { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let requests = handle.await.unwrap();
        assert!(requests[0].starts_with("DELETE /v0/appBase1/Analyses/rec1 "));
    }
}
