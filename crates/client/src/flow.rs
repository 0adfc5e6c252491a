use exposr_core::{
    AnalysisResult, ConsentFlags, FeedbackType, ImageUpload, Session, SessionState, Transition,
};
use tracing::warn;

use crate::{AnalysisClient, ClientError};

/// One upload-to-feedback interaction, driven against the API.
///
/// The flow owns a [`Session`]; every method applies the matching event and
/// performs the network call the new state calls for. Events the session
/// ignores (repeat feedback) never reach the network.
#[derive(Debug)]
pub struct AnalysisFlow {
    client: AnalysisClient,
    consent: ConsentFlags,
    session: Session,
}

impl AnalysisFlow {
    pub fn new(client: AnalysisClient, consent: ConsentFlags) -> Self {
        Self {
            client,
            consent,
            session: Session::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.session.result()
    }

    /// Analyze `upload`. Must be called from `Idle`.
    pub async fn start(&mut self, upload: ImageUpload) -> Result<&AnalysisResult, ClientError> {
        self.session.begin_analysis()?;
        match self.client.analyze_image(upload, &self.consent).await {
            Ok(result) => {
                self.session.complete(result)?;
            }
            Err(e) => {
                self.session.fail(e.to_string())?;
                return Err(e);
            }
        }
        self.session
            .result()
            .ok_or_else(|| ClientError::Configuration("analysis result missing".into()))
    }

    /// Register the thumbs choice. "Accurate" is submitted immediately;
    /// "inaccurate" waits for [`submit_comment`](Self::submit_comment) or
    /// [`skip_comment`](Self::skip_comment).
    pub async fn choose_feedback(&mut self, kind: FeedbackType) -> Result<Transition, ClientError> {
        match self.session.choose_feedback(kind)? {
            Transition::Ignored => Ok(Transition::Ignored),
            Transition::Moved(SessionState::FeedbackPending(_)) => self.submit_feedback().await,
            moved @ Transition::Moved(_) => Ok(moved),
        }
    }

    pub async fn submit_comment(&mut self, comment: &str) -> Result<Transition, ClientError> {
        match self.session.submit_comment(comment)? {
            Transition::Ignored => Ok(Transition::Ignored),
            Transition::Moved(_) => self.submit_feedback().await,
        }
    }

    pub async fn skip_comment(&mut self) -> Result<Transition, ClientError> {
        match self.session.skip_comment()? {
            Transition::Ignored => Ok(Transition::Ignored),
            Transition::Moved(_) => self.submit_feedback().await,
        }
    }

    /// Back to `Idle`, discarding the result and any feedback draft.
    pub fn reset(&mut self) -> Transition {
        self.session.reset()
    }

    /// Shareable link to the current result: `{origin}/#share/{analysisId}`.
    ///
    /// `None` without a result, and for fallback results, which exist only
    /// on this client.
    pub fn share_url(&self, origin: &str) -> Option<String> {
        let result = self.session.result().filter(|r| !r.fallback)?;
        Some(format!(
            "{}/#share/{}",
            origin.trim_end_matches('/'),
            result.analysis_id
        ))
    }

    async fn submit_feedback(&mut self) -> Result<Transition, ClientError> {
        let (Some(result), Some(draft)) = (self.session.result(), self.session.draft()) else {
            return Err(ClientError::Configuration("no feedback pending".into()));
        };
        let analysis_id = result.analysis_id.clone();
        let feedback_type = draft.feedback_type;
        let comment = draft.comment.clone();

        match self
            .client
            .api()
            .submit_feedback(&analysis_id, feedback_type, comment.as_deref())
            .await
        {
            Ok(_) => Ok(self.session.feedback_recorded()?),
            Err(e) => {
                warn!(%analysis_id, error = %e, "feedback submission failed");
                self.session.feedback_failed()?;
                Err(e)
            }
        }
    }
}
