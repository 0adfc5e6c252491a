use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use exposr_core::{FeedbackRecord, StoredRecord};
use exposr_store::{RecordStore, StoreError};

/// In-memory [`RecordStore`].
///
/// Rows are kept in insertion order and, like the hosted table, nothing
/// stops two rows from sharing an analysis id; lookups return the first.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    analyses: RwLock<Vec<StoredRecord>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `delete_analysis` fail while lookups keep working.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn analysis_count(&self) -> usize {
        self.analyses.read().len()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.read().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_analysis(&self, record: &StoredRecord) -> Result<StoredRecord, StoreError> {
        self.check_available()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = record.clone();
        stored.record_id = format!("rec{id:014}");
        self.analyses.write().push(stored.clone());
        Ok(stored)
    }

    async fn find_analysis(&self, analysis_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .analyses
            .read()
            .iter()
            .find(|r| r.analysis_id == analysis_id)
            .cloned())
    }

    async fn find_by_delete_digest(
        &self,
        digest: &str,
    ) -> Result<Option<StoredRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .analyses
            .read()
            .iter()
            .find(|r| r.delete_code_digest == digest)
            .cloned())
    }

    async fn delete_analysis(&self, record_id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store deletes switched off".into()));
        }
        let mut analyses = self.analyses.write();
        let before = analyses.len();
        analyses.retain(|r| r.record_id != record_id);
        Ok(analyses.len() != before)
    }

    async fn create_feedback(&self, feedback: &FeedbackRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.feedback.write().push(feedback.clone());
        Ok(())
    }

    async fn list_analyses(&self) -> Result<Vec<StoredRecord>, StoreError> {
        self.check_available()?;
        Ok(self.analyses.read().clone())
    }

    async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>, StoreError> {
        self.check_available()?;
        Ok(self.feedback.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use exposr_core::{FeedbackType, Verdict};

    use super::*;

    fn record(analysis_id: &str, digest: &str) -> StoredRecord {
        StoredRecord {
            record_id: String::new(),
            analysis_id: analysis_id.into(),
            filename: "a.jpg".into(),
            confidence: 80,
            verdict: Verdict::LikelyHuman,
            is_ai: false,
            timestamp: Utc::now(),
            file_format: "JPEG".into(),
            image_width: 10,
            image_height: 10,
            file_size_kb: 1,
            delete_code_digest: digest.into(),
            media_id: None,
            image_url: None,
            research_consent: true,
            country: None,
            region: None,
            encrypted_context: None,
        }
    }

    #[tokio::test]
    async fn assigns_record_ids_and_finds_first_match() {
        let store = MemoryRecordStore::new();
        let first = store.create_analysis(&record("dup", "d1")).await.unwrap();
        let second = store.create_analysis(&record("dup", "d2")).await.unwrap();
        assert_ne!(first.record_id, second.record_id);
        assert!(!first.record_id.is_empty());

        let found = store.find_analysis("dup").await.unwrap().unwrap();
        assert_eq!(found.record_id, first.record_id);

        let by_digest = store.find_by_delete_digest("d2").await.unwrap().unwrap();
        assert_eq!(by_digest.record_id, second.record_id);
        assert!(store.find_analysis("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_only_target_row() {
        let store = MemoryRecordStore::new();
        let a = store.create_analysis(&record("a", "da")).await.unwrap();
        store.create_analysis(&record("b", "db")).await.unwrap();

        assert!(store.delete_analysis(&a.record_id).await.unwrap());
        assert!(!store.delete_analysis(&a.record_id).await.unwrap());
        assert_eq!(store.analysis_count(), 1);
        assert!(store.find_analysis("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn feedback_is_listed_in_order() {
        let store = MemoryRecordStore::new();
        store
            .create_feedback(&FeedbackRecord::new("a", FeedbackType::Accurate, None))
            .await
            .unwrap();
        store
            .create_feedback(&FeedbackRecord::new("a", FeedbackType::Inaccurate, Some("off")))
            .await
            .unwrap();
        let listed = store.list_feedback().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].comment.as_deref(), Some("off"));
    }

    #[tokio::test]
    async fn unavailable_toggle() {
        let store = MemoryRecordStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.create_analysis(&record("a", "d")).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.list_analyses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_deletes_keep_rows() {
        let store = MemoryRecordStore::new();
        let stored = store.create_analysis(&record("a", "d")).await.unwrap();
        store.set_fail_deletes(true);
        assert!(store.delete_analysis(&stored.record_id).await.is_err());
        assert!(store.find_analysis("a").await.unwrap().is_some());
        store.set_fail_deletes(false);
        assert!(store.delete_analysis(&stored.record_id).await.unwrap());
    }
}
