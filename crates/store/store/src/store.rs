use async_trait::async_trait;
use exposr_core::{FeedbackRecord, StoredRecord};

use crate::error::StoreError;

/// Trait for persisting analysis and feedback rows.
///
/// The store gives no uniqueness or transactional guarantees: two rows can
/// share an analysis id, and lookups resolve to the first match.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Insert an analysis row. Returns the row with its store-assigned
    /// `record_id` filled in.
    async fn create_analysis(&self, record: &StoredRecord) -> Result<StoredRecord, StoreError>;

    /// First row whose analysis id equals `analysis_id`.
    async fn find_analysis(&self, analysis_id: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// First row whose delete-code digest equals `digest`.
    async fn find_by_delete_digest(&self, digest: &str)
    -> Result<Option<StoredRecord>, StoreError>;

    /// Remove a row by its store-assigned id. Returns `true` if it existed.
    async fn delete_analysis(&self, record_id: &str) -> Result<bool, StoreError>;

    async fn create_feedback(&self, feedback: &FeedbackRecord) -> Result<(), StoreError>;

    /// All analysis rows, oldest first.
    async fn list_analyses(&self) -> Result<Vec<StoredRecord>, StoreError>;

    /// All feedback rows, oldest first.
    async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>, StoreError>;
}
