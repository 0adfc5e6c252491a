use serde::{Deserialize, Serialize};

use crate::analysis::PublicAnalysis;
use crate::feedback::{FeedbackRecord, FeedbackType};
use crate::record::StoredRecord;

/// Number of most recent analyses included in [`DashboardStats`].
const RECENT_ANALYSES: usize = 10;

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DashboardStats {
    pub total_analyses: usize,
    pub total_feedback: usize,
    /// Feedback count as a percentage of analyses, rounded to one decimal.
    pub feedback_rate: f64,
    pub accurate_feedback: usize,
    pub inaccurate_feedback: usize,
    pub consented_images: usize,
    pub ai_detected: usize,
    pub human_detected: usize,
    /// Mean confidence across analyses, rounded to one decimal.
    pub avg_confidence: f64,
    pub recent_analyses: Vec<PublicAnalysis>,
}

impl DashboardStats {
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(analyses: &[StoredRecord], feedback: &[FeedbackRecord]) -> Self {
        let total_analyses = analyses.len();
        let total_feedback = feedback.len();

        let accurate_feedback = feedback
            .iter()
            .filter(|f| f.feedback_type == FeedbackType::Accurate)
            .count();

        let feedback_rate = if total_analyses == 0 {
            0.0
        } else {
            round1(total_feedback as f64 / total_analyses as f64 * 100.0)
        };

        let avg_confidence = if total_analyses == 0 {
            0.0
        } else {
            let sum: u64 = analyses.iter().map(|a| u64::from(a.confidence)).sum();
            round1(sum as f64 / total_analyses as f64)
        };

        let mut recent: Vec<&StoredRecord> = analyses.iter().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Self {
            total_analyses,
            total_feedback,
            feedback_rate,
            accurate_feedback,
            inaccurate_feedback: total_feedback - accurate_feedback,
            consented_images: analyses.iter().filter(|a| a.research_consent).count(),
            ai_detected: analyses.iter().filter(|a| a.is_ai).count(),
            human_detected: analyses.iter().filter(|a| !a.is_ai).count(),
            avg_confidence,
            recent_analyses: recent
                .into_iter()
                .take(RECENT_ANALYSES)
                .map(StoredRecord::public_view)
                .collect(),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::analysis::tests::sample_result;

    fn record(confidence: u8, is_ai: bool, consent: bool, age_minutes: i64) -> StoredRecord {
        let mut result = sample_result();
        result.confidence = confidence;
        result.is_ai = is_ai;
        result.timestamp = Utc::now() - Duration::minutes(age_minutes);
        StoredRecord::from_result(&result, "d".into()).with_research_consent(consent)
    }

    #[test]
    fn empty_store_yields_zeroes() {
        let stats = DashboardStats::compute(&[], &[]);
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn aggregates_counts_and_rates() {
        let analyses = vec![
            record(90, true, true, 3),
            record(80, false, false, 2),
            record(71, false, true, 1),
        ];
        let feedback = vec![
            FeedbackRecord::new("a", FeedbackType::Accurate, None),
            FeedbackRecord::new("b", FeedbackType::Inaccurate, Some("nope")),
        ];
        let stats = DashboardStats::compute(&analyses, &feedback);
        assert_eq!(stats.total_analyses, 3);
        assert_eq!(stats.total_feedback, 2);
        assert!((stats.feedback_rate - 66.7).abs() < f64::EPSILON);
        assert_eq!(stats.accurate_feedback, 1);
        assert_eq!(stats.inaccurate_feedback, 1);
        assert_eq!(stats.consented_images, 2);
        assert_eq!(stats.ai_detected, 1);
        assert_eq!(stats.human_detected, 2);
        assert!((stats.avg_confidence - 80.3).abs() < f64::EPSILON);
    }

    #[test]
    fn recent_analyses_are_newest_first_and_capped() {
        let analyses: Vec<_> = (0..15)
            .map(|i| record(50 + i, false, false, i64::from(i)))
            .collect();
        let stats = DashboardStats::compute(&analyses, &[]);
        assert_eq!(stats.recent_analyses.len(), RECENT_ANALYSES);
        assert_eq!(stats.recent_analyses[0].confidence, 50);
        assert_eq!(stats.recent_analyses[9].confidence, 59);
    }
}
