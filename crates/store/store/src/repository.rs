use std::sync::Arc;

use exposr_core::{
    AnalysisResult, ClientContext, ConsentFlags, DashboardStats, DeleteCodeHasher, FeedbackRecord,
    FeedbackType, ImageUpload, StoredRecord,
};
use exposr_media::{MediaAsset, MediaHost};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{RepositoryError, StoreError};
use crate::store::RecordStore;

/// Seals request metadata before it is written to the store.
pub trait ContextSealer: Send + Sync {
    fn seal(&self, plaintext: &str) -> Result<String, String>;
}

/// What [`ResultRepository::persist`] did with a result.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// Research consent was not granted; nothing left the process.
    Skipped,
    /// The row was written. `media` is `None` when no host is configured or
    /// the image upload failed.
    Stored {
        record: StoredRecord,
        media: Option<MediaAsset>,
    },
}

impl PersistOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Persists analysis results and feedback across the tabular store and the
/// media host, and resolves delete codes back to stored rows.
///
/// Plaintext delete codes never reach the store; rows carry a keyed digest.
pub struct ResultRepository {
    store: Arc<dyn RecordStore>,
    media: Option<Arc<dyn MediaHost>>,
    hasher: DeleteCodeHasher,
    sealer: Option<Arc<dyn ContextSealer>>,
}

impl ResultRepository {
    pub fn new(store: Arc<dyn RecordStore>, hasher: DeleteCodeHasher) -> Self {
        Self {
            store,
            media: None,
            hasher,
            sealer: None,
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: Arc<dyn MediaHost>) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_sealer(mut self, sealer: Arc<dyn ContextSealer>) -> Self {
        self.sealer = Some(sealer);
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn hasher(&self) -> &DeleteCodeHasher {
        &self.hasher
    }

    /// Store a result if the uploader granted research consent.
    ///
    /// The image is uploaded first; an upload failure is logged and the row
    /// is written without media. If the row cannot be written, the uploaded
    /// image is removed again on a best-effort basis and the store error is
    /// returned.
    #[instrument(skip_all, fields(analysis_id = %result.analysis_id))]
    pub async fn persist(
        &self,
        result: &AnalysisResult,
        upload: &ImageUpload,
        consent: &ConsentFlags,
        context: &ClientContext,
    ) -> Result<PersistOutcome, StoreError> {
        if !consent.research_training() {
            debug!("research consent not granted, skipping storage");
            return Ok(PersistOutcome::Skipped);
        }

        let mut record =
            StoredRecord::from_result(result, self.hasher.digest(&result.delete_code))
                .with_research_consent(true)
                .with_location(context.country.clone(), context.region.clone())
                .with_encrypted_context(self.seal_context(context));

        let media = match &self.media {
            Some(host) => match host
                .upload(&result.analysis_id, &upload.content_type, upload.bytes.clone())
                .await
            {
                Ok(asset) => {
                    debug!(media_id = %asset.public_id, host = host.name(), "image uploaded");
                    record = record.with_media(&asset.public_id, &asset.secure_url);
                    Some(asset)
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        host = host.name(),
                        "image upload failed, storing record without media"
                    );
                    None
                }
            },
            None => None,
        };

        match self.store.create_analysis(&record).await {
            Ok(stored) => {
                info!(record_id = %stored.record_id, "analysis stored");
                Ok(PersistOutcome::Stored {
                    record: stored,
                    media,
                })
            }
            Err(e) => {
                error!(error = %e, store = self.store.name(), "failed to store analysis");
                if let Some(asset) = &media {
                    self.discard_media(&asset.public_id).await;
                }
                Err(e)
            }
        }
    }

    /// First stored row for `analysis_id`.
    #[instrument(skip(self))]
    pub async fn lookup(&self, analysis_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.store.find_analysis(analysis_id).await
    }

    /// Delete the row for `analysis_id` if `code` matches its digest.
    #[instrument(skip(self, code))]
    pub async fn delete_by_analysis(
        &self,
        analysis_id: &str,
        code: &str,
    ) -> Result<StoredRecord, RepositoryError> {
        if code.trim().is_empty() {
            return Err(RepositoryError::MissingCode);
        }
        let record = self
            .store
            .find_analysis(analysis_id)
            .await?
            .ok_or(RepositoryError::RecordNotFound)?;

        if !self.hasher.verify(code, &record.delete_code_digest) {
            warn!("delete code mismatch");
            return Err(RepositoryError::InvalidDeleteCode);
        }
        self.remove(record).await
    }

    /// Delete whichever row `code` belongs to.
    #[instrument(skip_all)]
    pub async fn delete_by_code(&self, code: &str) -> Result<StoredRecord, RepositoryError> {
        if code.trim().is_empty() {
            return Err(RepositoryError::MissingCode);
        }
        let digest = self.hasher.digest(code);
        let record = self
            .store
            .find_by_delete_digest(&digest)
            .await?
            .ok_or(RepositoryError::RecordNotFound)?;
        self.remove(record).await
    }

    #[instrument(skip(self, comment))]
    pub async fn record_feedback(
        &self,
        analysis_id: &str,
        feedback_type: FeedbackType,
        comment: Option<&str>,
    ) -> Result<FeedbackRecord, StoreError> {
        let feedback = FeedbackRecord::new(analysis_id, feedback_type, comment);
        self.store.create_feedback(&feedback).await?;
        info!(feedback_id = %feedback.feedback_id, "feedback recorded");
        Ok(feedback)
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, StoreError> {
        let analyses = self.store.list_analyses().await?;
        let feedback = self.store.list_feedback().await?;
        Ok(DashboardStats::compute(&analyses, &feedback))
    }

    /// Row first, so a store failure never leaves a row pointing at a
    /// destroyed image. Media removal is best-effort.
    async fn remove(&self, record: StoredRecord) -> Result<StoredRecord, RepositoryError> {
        self.store.delete_analysis(&record.record_id).await?;
        info!(analysis_id = %record.analysis_id, record_id = %record.record_id, "analysis deleted");
        if let Some(media_id) = &record.media_id {
            self.discard_media(media_id).await;
        }
        Ok(record)
    }

    async fn discard_media(&self, media_id: &str) {
        let Some(host) = &self.media else {
            return;
        };
        match host.destroy(media_id).await {
            Ok(existed) => debug!(media_id, existed, "media removed"),
            Err(e) => warn!(media_id, error = %e, "failed to remove media"),
        }
    }

    fn seal_context(&self, context: &ClientContext) -> Option<String> {
        let sealer = self.sealer.as_ref()?;
        if context == &ClientContext::default() {
            return None;
        }
        let plaintext = serde_json::to_string(context).ok()?;
        match sealer.seal(&plaintext) {
            Ok(sealed) => Some(sealed),
            Err(e) => {
                warn!(error = %e, "failed to seal client context, dropping it");
                None
            }
        }
    }
}
