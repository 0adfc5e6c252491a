pub mod analysis;
pub mod consent;
pub mod error;
pub mod feedback;
pub mod image_kind;
pub mod record;
pub mod session;
pub mod stats;
pub mod token;
pub mod upload;

pub use analysis::{AnalysisResult, PublicAnalysis, Verdict, explanation_for};
pub use consent::{ConsentFlags, RESEARCH_TRAINING};
pub use error::{IdentifierError, SessionError};
pub use feedback::{FeedbackRecord, FeedbackType, MAX_COMMENT_CHARS, sanitize_comment};
pub use image_kind::ImageKind;
pub use record::{ClientContext, StoredRecord};
pub use session::{FeedbackDraft, Session, SessionState, Transition};
pub use stats::DashboardStats;
pub use token::{
    DeleteCodeHasher, generate_analysis_id, generate_delete_code, generate_feedback_id,
    validate_analysis_id, validate_delete_code,
};
pub use upload::{AnalysisRequest, ImageUpload};
