//! Presentation and feedback lifecycle of a single analysis.
//!
//! ```text
//! Idle -> Analyzing -> Complete -> FeedbackPending(accurate) ----------> FeedbackThanked
//!                   \           \-> AwaitingComment -> FeedbackPending(inaccurate) -/
//!                    -> Error
//! ```
//!
//! `Reset` returns any state to `Idle` and discards the result, error and
//! feedback draft.

use std::fmt;

use crate::analysis::AnalysisResult;
use crate::error::SessionError;
use crate::feedback::FeedbackType;

/// Current position in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Analyzing,
    Complete,
    Error,
    /// A feedback choice has been made and its submission is outstanding.
    FeedbackPending(FeedbackType),
    /// "Inaccurate" was chosen; waiting for a comment or a skip.
    AwaitingComment,
    FeedbackThanked,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Analyzing => f.write_str("analyzing"),
            Self::Complete => f.write_str("complete"),
            Self::Error => f.write_str("error"),
            Self::FeedbackPending(kind) => write!(f, "feedback_pending({kind})"),
            Self::AwaitingComment => f.write_str("awaiting_comment"),
            Self::FeedbackThanked => f.write_str("feedback_thanked"),
        }
    }
}

/// Outcome of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The session moved to the contained state.
    Moved(SessionState),
    /// The event was a repeat of one already handled and changed nothing.
    Ignored,
}

/// Feedback choice plus optional comment awaiting submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub feedback_type: FeedbackType,
    pub comment: Option<String>,
}

/// State holder for one upload-to-feedback flow.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    result: Option<AnalysisResult>,
    error: Option<String>,
    draft: Option<FeedbackDraft>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            result: None,
            error: None,
            draft: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn draft(&self) -> Option<&FeedbackDraft> {
        self.draft.as_ref()
    }

    fn illegal(&self, event: &'static str) -> SessionError {
        SessionError::IllegalTransition {
            event,
            state: self.state,
        }
    }

    fn move_to(&mut self, state: SessionState) -> Transition {
        self.state = state;
        Transition::Moved(state)
    }

    /// `Idle -> Analyzing`.
    pub fn begin_analysis(&mut self) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::Idle => Ok(self.move_to(SessionState::Analyzing)),
            _ => Err(self.illegal("begin analysis")),
        }
    }

    /// `Analyzing -> Complete`.
    pub fn complete(&mut self, result: AnalysisResult) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::Analyzing => {
                self.result = Some(result);
                self.error = None;
                Ok(self.move_to(SessionState::Complete))
            }
            _ => Err(self.illegal("complete analysis")),
        }
    }

    /// `Analyzing -> Error`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::Analyzing => {
                self.error = Some(message.into());
                Ok(self.move_to(SessionState::Error))
            }
            _ => Err(self.illegal("fail analysis")),
        }
    }

    /// Register the first thumbs choice.
    ///
    /// "Accurate" goes straight to `FeedbackPending`, ready for submission.
    /// "Inaccurate" passes through `FeedbackPending` into `AwaitingComment`.
    /// Any choice made after the first one is ignored.
    pub fn choose_feedback(&mut self, kind: FeedbackType) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::Complete => {
                self.draft = Some(FeedbackDraft {
                    feedback_type: kind,
                    comment: None,
                });
                self.state = SessionState::FeedbackPending(kind);
                match kind {
                    FeedbackType::Accurate => Ok(Transition::Moved(self.state)),
                    FeedbackType::Inaccurate => Ok(self.move_to(SessionState::AwaitingComment)),
                }
            }
            SessionState::FeedbackPending(_)
            | SessionState::AwaitingComment
            | SessionState::FeedbackThanked => Ok(Transition::Ignored),
            _ => Err(self.illegal("choose feedback")),
        }
    }

    /// `AwaitingComment -> FeedbackPending(inaccurate)` with the comment
    /// attached to the draft.
    pub fn submit_comment(&mut self, comment: &str) -> Result<Transition, SessionError> {
        self.leave_comment_box(Some(comment))
    }

    /// `AwaitingComment -> FeedbackPending(inaccurate)` without a comment.
    pub fn skip_comment(&mut self) -> Result<Transition, SessionError> {
        self.leave_comment_box(None)
    }

    fn leave_comment_box(&mut self, comment: Option<&str>) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::AwaitingComment => {
                if let Some(draft) = self.draft.as_mut() {
                    draft.comment = comment.and_then(crate::feedback::sanitize_comment);
                }
                Ok(self.move_to(SessionState::FeedbackPending(FeedbackType::Inaccurate)))
            }
            SessionState::FeedbackThanked => Ok(Transition::Ignored),
            _ => Err(self.illegal("submit comment")),
        }
    }

    /// The outstanding submission was stored. Terminal.
    pub fn feedback_recorded(&mut self) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::FeedbackPending(_) => Ok(self.move_to(SessionState::FeedbackThanked)),
            SessionState::FeedbackThanked => Ok(Transition::Ignored),
            _ => Err(self.illegal("record feedback")),
        }
    }

    /// The outstanding submission failed. "Accurate" returns to `Complete`
    /// so the choice can be made again; "inaccurate" returns to the comment
    /// box with the draft intact.
    pub fn feedback_failed(&mut self) -> Result<Transition, SessionError> {
        match self.state {
            SessionState::FeedbackPending(FeedbackType::Accurate) => {
                self.draft = None;
                Ok(self.move_to(SessionState::Complete))
            }
            SessionState::FeedbackPending(FeedbackType::Inaccurate) => {
                Ok(self.move_to(SessionState::AwaitingComment))
            }
            _ => Err(self.illegal("fail feedback")),
        }
    }

    /// Back to `Idle` from anywhere, discarding all transient data.
    pub fn reset(&mut self) -> Transition {
        self.result = None;
        self.error = None;
        self.draft = None;
        self.move_to(SessionState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_result;

    fn completed() -> Session {
        let mut session = Session::new();
        session.begin_analysis().unwrap();
        session.complete(sample_result()).unwrap();
        session
    }

    #[test]
    fn happy_path_accurate() {
        let mut session = completed();
        assert_eq!(session.state(), SessionState::Complete);
        assert!(session.result().is_some());

        let t = session.choose_feedback(FeedbackType::Accurate).unwrap();
        assert_eq!(
            t,
            Transition::Moved(SessionState::FeedbackPending(FeedbackType::Accurate))
        );
        session.feedback_recorded().unwrap();
        assert_eq!(session.state(), SessionState::FeedbackThanked);
    }

    #[test]
    fn inaccurate_goes_through_comment_box() {
        let mut session = completed();
        let t = session.choose_feedback(FeedbackType::Inaccurate).unwrap();
        assert_eq!(t, Transition::Moved(SessionState::AwaitingComment));

        session.submit_comment("  it's a painting  ").unwrap();
        assert_eq!(
            session.state(),
            SessionState::FeedbackPending(FeedbackType::Inaccurate)
        );
        assert_eq!(
            session.draft().unwrap().comment.as_deref(),
            Some("it's a painting")
        );
        session.feedback_recorded().unwrap();
        assert_eq!(session.state(), SessionState::FeedbackThanked);
    }

    #[test]
    fn skip_comment_submits_without_text() {
        let mut session = completed();
        session.choose_feedback(FeedbackType::Inaccurate).unwrap();
        session.skip_comment().unwrap();
        assert!(session.draft().unwrap().comment.is_none());
    }

    #[test]
    fn repeated_feedback_is_ignored() {
        let mut session = completed();
        session.choose_feedback(FeedbackType::Accurate).unwrap();
        assert_eq!(
            session.choose_feedback(FeedbackType::Inaccurate).unwrap(),
            Transition::Ignored
        );
        session.feedback_recorded().unwrap();
        assert_eq!(
            session.choose_feedback(FeedbackType::Accurate).unwrap(),
            Transition::Ignored
        );
        assert_eq!(session.feedback_recorded().unwrap(), Transition::Ignored);
        assert_eq!(session.state(), SessionState::FeedbackThanked);
    }

    #[test]
    fn failed_accurate_submission_allows_retry() {
        let mut session = completed();
        session.choose_feedback(FeedbackType::Accurate).unwrap();
        session.feedback_failed().unwrap();
        assert_eq!(session.state(), SessionState::Complete);
        assert!(session.draft().is_none());
        assert!(matches!(
            session.choose_feedback(FeedbackType::Accurate).unwrap(),
            Transition::Moved(_)
        ));
    }

    #[test]
    fn failed_comment_submission_returns_to_comment_box() {
        let mut session = completed();
        session.choose_feedback(FeedbackType::Inaccurate).unwrap();
        session.submit_comment("blurry").unwrap();
        session.feedback_failed().unwrap();
        assert_eq!(session.state(), SessionState::AwaitingComment);
        assert_eq!(session.draft().unwrap().comment.as_deref(), Some("blurry"));
    }

    #[test]
    fn error_path_and_reset() {
        let mut session = Session::new();
        session.begin_analysis().unwrap();
        session.fail("backend down").unwrap();
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.error(), Some("backend down"));

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.error().is_none());
        assert!(session.result().is_none());
    }

    #[test]
    fn reset_discards_feedback_progress() {
        let mut session = completed();
        session.choose_feedback(FeedbackType::Inaccurate).unwrap();
        session.reset();
        assert!(session.draft().is_none());
        session.begin_analysis().unwrap();
        assert_eq!(session.state(), SessionState::Analyzing);
    }

    #[test]
    fn illegal_events_leave_state_unchanged() {
        let mut session = Session::new();
        let err = session.choose_feedback(FeedbackType::Accurate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot choose feedback while idle"
        );
        assert!(session.complete(sample_result()).is_err());
        assert!(session.submit_comment("x").is_err());
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_analysis().unwrap();
        assert!(session.begin_analysis().is_err());
        assert_eq!(session.state(), SessionState::Analyzing);
    }
}
