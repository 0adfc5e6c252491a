use std::sync::Arc;

use chrono::Utc;
use exposr_core::{
    AnalysisResult, ConsentFlags, ImageKind, ImageUpload, generate_analysis_id,
    generate_delete_code,
};
use exposr_detector::{DynDetector, SimulatedDetector};
use exposr_intake::{Compressor, FileValidator, probe_dimensions};
use tracing::{debug, info, instrument, warn};

use crate::{ClientError, ExposrClient};

/// Upload pipeline: local validation, best-effort compression, remote
/// analysis, and a simulated result when the remote path fails.
#[derive(Clone)]
pub struct AnalysisClient {
    api: ExposrClient,
    validator: FileValidator,
    compressor: Arc<Compressor>,
    fallback: Arc<dyn DynDetector>,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("api", &self.api)
            .field("validator", &self.validator)
            .field("fallback", &self.fallback.name())
            .finish_non_exhaustive()
    }
}

impl AnalysisClient {
    /// Default validation and compression, with the stock
    /// [`SimulatedDetector`] as fallback.
    pub fn new(api: ExposrClient) -> Self {
        Self {
            api,
            validator: FileValidator::default(),
            compressor: Arc::new(Compressor::default()),
            fallback: Arc::new(SimulatedDetector::default()),
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn DynDetector>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn api(&self) -> &ExposrClient {
        &self.api
    }

    /// Analyze one image.
    ///
    /// Validation failures are returned without any network call. Any
    /// failure of the remote analysis is replaced by a locally simulated
    /// result marked `fallback`; only the simulation's own load failure
    /// surfaces, as [`ClientError::Transient`].
    #[instrument(skip_all, fields(filename = %upload.filename))]
    pub async fn analyze_image(
        &self,
        upload: ImageUpload,
        consent: &ConsentFlags,
    ) -> Result<AnalysisResult, ClientError> {
        self.validator.validate(&upload)?;
        let upload = self.compress(upload).await;

        match self.api.analyze(&upload, consent).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, "remote analysis failed, using simulated result");
                self.simulate(&upload).await
            }
        }
    }

    /// Delete the stored data belonging to `delete_code`.
    pub async fn delete_my_data(&self, delete_code: &str) -> Result<(), ClientError> {
        let code = delete_code.trim();
        if code.is_empty() {
            return Err(ClientError::MissingCode);
        }
        self.api.delete_by_code(code).await?;
        info!("stored analysis deleted");
        Ok(())
    }

    async fn compress(&self, upload: ImageUpload) -> ImageUpload {
        let compressor = Arc::clone(&self.compressor);
        let original = upload.clone();
        match tokio::task::spawn_blocking(move || {
            let outcome = compressor.compress(&upload);
            (outcome.compressed, outcome.into_upload(upload.filename))
        })
        .await
        {
            Ok((compressed, upload)) => {
                if compressed {
                    debug!(
                        original = original.len(),
                        compressed = upload.len(),
                        "upload compressed"
                    );
                }
                upload
            }
            Err(e) => {
                warn!(error = %e, "compression task failed, sending original");
                original
            }
        }
    }

    async fn simulate(&self, upload: &ImageUpload) -> Result<AnalysisResult, ClientError> {
        let detection = self
            .fallback
            .detect(upload)
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;
        let (image_width, image_height) = probe_dimensions(&upload.bytes).unwrap_or((0, 0));
        let file_format = upload
            .declared_kind()
            .map_or("UNKNOWN", ImageKind::label)
            .to_owned();

        Ok(AnalysisResult {
            analysis_id: generate_analysis_id(),
            filename: upload.filename.clone(),
            confidence: detection.confidence,
            verdict: detection.verdict,
            is_ai: detection.is_ai,
            timestamp: Utc::now(),
            file_format,
            image_width,
            image_height,
            file_size_kb: upload.size_kb(),
            delete_code: generate_delete_code(),
            explanation: detection.explanation,
            evidence: detection.evidence,
            detection_details: None,
            fallback: true,
        })
    }
}
