use storage::SessionStore;
use studygap_core::model::QuizSnapshot;

use super::progress::ResumeSummary;

/// Read-only gate deciding whether a stored session is worth offering to
/// resume.
///
/// Never mutates the store and never errors toward the UI: malformed or
/// unreadable state simply means there is nothing to resume. Whether to
/// resume or discard is always an explicit user choice made on top of
/// these answers.
#[derive(Clone)]
pub struct ResumeGate {
    store: SessionStore,
}

impl ResumeGate {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// The one predicate both public answers are derived from.
    ///
    /// A snapshot qualifies when it parsed into shape (question list and
    /// index present) and has at least one answered question. Zero answered
    /// means the session never started or was already submitted; neither
    /// warrants a resume prompt.
    async fn resumable_snapshot(&self) -> Option<QuizSnapshot> {
        match self.store.load_quiz().await {
            Ok(Some(snapshot)) if snapshot.is_resumable() => Some(snapshot),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "resume gate could not read the store");
                None
            }
        }
    }

    /// True iff a resumable session is stored.
    pub async fn has_resumable_session(&self) -> bool {
        self.resumable_snapshot().await.is_some()
    }

    /// Summary of the stored session, `None` exactly when
    /// [`has_resumable_session`](Self::has_resumable_session) is false.
    pub async fn resume_summary(&self) -> Option<ResumeSummary> {
        self.resumable_snapshot().await.map(|snapshot| ResumeSummary {
            current_question: snapshot.current_index,
            total_questions: snapshot.total_questions(),
            answered_count: snapshot.answered_count(),
            saved_at: snapshot.created_at,
        })
    }
}
