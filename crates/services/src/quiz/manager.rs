use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use storage::SessionStore;
use studygap_core::Clock;
use studygap_core::model::{
    CompletedQuiz, DiagnosticReport, GuestDiagnostic, QuestionId, QuestionResponse, QuizId,
    QuizQuestion, QuizSnapshot, ResponsePatch, answered_count,
};

use super::progress::QuizProgress;
use crate::backend::{AnalyzeRequest, QuizBackend};
use crate::error::QuizError;

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub report: DiagnosticReport,
    pub quiz_id: Option<QuizId>,
}

/// Owns the in-memory state of the current quiz attempt and mirrors it
/// into the session store under the guest persistence rule.
///
/// The rule: a snapshot is written if and only if at least one response is
/// answered. When the answered count transitions back to zero the stored
/// snapshot is deleted, never overwritten with empty data. The snapshot's
/// creation timestamp is set on the first successful persist and preserved
/// verbatim by every later save of the same logical session.
pub struct QuizSessionManager {
    clock: Clock,
    store: SessionStore,
    backend: Arc<dyn QuizBackend>,
    subject: String,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    responses: HashMap<QuestionId, QuestionResponse>,
    time_spent: HashMap<QuestionId, u32>,
    started_at: DateTime<Utc>,
    first_saved_at: Option<DateTime<Utc>>,
    persisted_once: bool,
    quiz_id: Option<QuizId>,
    guest: bool,
}

impl QuizSessionManager {
    /// Create a manager over an already-fetched question set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if the set is empty.
    pub fn new(
        clock: Clock,
        store: SessionStore,
        backend: Arc<dyn QuizBackend>,
        questions: Vec<QuizQuestion>,
        guest: bool,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let started_at = clock.now();
        Ok(Self {
            clock,
            store,
            backend,
            subject: "Mathematics".into(),
            questions,
            current_index: 0,
            responses: HashMap::new(),
            time_spent: HashMap::new(),
            started_at,
            first_saved_at: None,
            persisted_once: false,
            quiz_id: None,
            guest,
        })
    }

    /// Fetch questions and start an attempt.
    ///
    /// Authenticated users also open a durable quiz with the backend and
    /// carry its id on submission; guests skip that call entirely.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the fetch fails or yields no questions.
    pub async fn begin(
        clock: Clock,
        store: SessionStore,
        backend: Arc<dyn QuizBackend>,
        total_questions: u32,
        guest: bool,
    ) -> Result<Self, QuizError> {
        let questions = backend.fetch_questions(total_questions).await?;
        let mut manager = Self::new(clock, store, backend, questions, guest)?;
        if !guest {
            manager.quiz_id = manager
                .backend
                .start_quiz(manager.questions.len() as u32)
                .await?;
        }
        Ok(manager)
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn response(&self, question_id: &QuestionId) -> Option<&QuestionResponse> {
        self.responses.get(question_id)
    }

    #[must_use]
    pub fn time_spent(&self, question_id: &QuestionId) -> u32 {
        self.time_spent.get(question_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn quiz_id(&self) -> Option<&QuizId> {
        self.quiz_id.as_ref()
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.guest
    }

    /// Answered questions in the live state, per the shared counting rule.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        answered_count(&self.responses)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        QuizProgress {
            total: self.questions.len(),
            answered: self.answered_count(),
            current_index: self.current_index,
        }
    }

    /// Merge partial fields into the response for a question, seeding a
    /// default response (answer defaulted to the first option) if none
    /// exists yet. Always succeeds; persistence failures are logged, not
    /// surfaced.
    pub async fn update_response(&mut self, question_id: &QuestionId, patch: ResponsePatch) {
        let Some(position) = self.questions.iter().position(|q| &q.id == question_id) else {
            tracing::debug!(question = %question_id, "ignoring response for unknown question");
            return;
        };

        let question = &self.questions[position];
        let response = self
            .responses
            .entry(question_id.clone())
            .or_insert_with(|| QuestionResponse::seeded(position as u32 + 1, question));
        patch.apply(response);

        self.flush().await;
    }

    /// Overwrite the cumulative seconds recorded for a question.
    ///
    /// Monotonic increase is the caller's concern; the timer feeding this
    /// already continues from the recorded base.
    pub async fn update_time_spent(&mut self, question_id: &QuestionId, seconds: u32) {
        self.time_spent.insert(question_id.clone(), seconds);
        self.flush().await;
    }

    /// Move to a question, clamping the index into range.
    pub async fn go_to_question(&mut self, index: usize) {
        self.current_index = index.min(self.questions.len().saturating_sub(1));
        self.flush().await;
    }

    /// Discard all progress and start fresh, removing any stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the stored snapshot cannot be removed.
    pub async fn reset(&mut self) -> Result<(), QuizError> {
        self.responses.clear();
        self.time_spent.clear();
        self.current_index = 0;
        self.started_at = self.clock.now();
        self.first_saved_at = None;
        self.persisted_once = false;

        self.store.clear_quiz().await?;
        tracing::debug!("cleared saved quiz, starting fresh");
        Ok(())
    }

    /// Load stored progress into this attempt, after the user chose to
    /// resume.
    ///
    /// Stored responses for questions the source no longer serves are
    /// dropped and the index is clamped. Returns `false` when there is
    /// nothing usable to restore.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn restore_from_store(&mut self) -> Result<bool, QuizError> {
        if !self.guest {
            tracing::debug!("authenticated attempts do not restore from the guest slot");
            return Ok(false);
        }
        let Some(snapshot) = self.store.load_quiz().await? else {
            return Ok(false);
        };

        let restored = snapshot.project_onto(&self.questions);
        self.current_index = restored.current_index;
        self.responses = restored.responses;
        self.time_spent = restored.time_spent;
        self.started_at = restored.started_at;
        self.first_saved_at = Some(restored.created_at);
        self.persisted_once = true;
        tracing::debug!(
            answered = self.answered_count(),
            index = self.current_index,
            "restored saved quiz"
        );
        Ok(true)
    }

    /// Build the full ordered submission list: one record per question,
    /// answered or not, with seconds taken from the time map.
    fn build_submission_list(&self) -> Vec<QuestionResponse> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let mut response = self
                    .responses
                    .get(&question.id)
                    .cloned()
                    .unwrap_or_else(|| QuestionResponse::unanswered(index as u32 + 1, question));
                response.time_spent_seconds = self.time_spent(&question.id);
                response
            })
            .collect()
    }

    /// Submit the attempt for diagnostic analysis.
    ///
    /// The emitted list always covers every question. On success for a
    /// guest attempt the diagnostic is stored locally and the in-progress
    /// snapshot is deleted; the attempt is complete, not resumable.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AuthRequired` when the backend turns an
    /// anonymous submission away with 401, carrying the original failure.
    /// Other collaborator and store failures propagate as-is.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, QuizError> {
        let questions_list = self.build_submission_list();
        let time_taken = self.clock.minutes_since(self.started_at);
        let request = AnalyzeRequest {
            subject: self.subject.clone(),
            total_questions: self.questions.len() as u32,
            time_taken,
            questions_list,
            quiz_id: self.quiz_id.clone(),
        };

        let outcome = match self.backend.analyze_diagnostic(&request).await {
            Ok(outcome) => outcome,
            Err(err) if self.guest && err.is_unauthorized() => {
                return Err(QuizError::AuthRequired { source: err });
            }
            Err(err) => return Err(err.into()),
        };

        if self.guest {
            let diagnostic = GuestDiagnostic {
                diagnostic: outcome.report.clone(),
                quiz: CompletedQuiz {
                    questions: self.questions.clone(),
                    responses: self.responses.clone(),
                    total_time_minutes: time_taken,
                },
                saved_at: self.clock.now(),
            };
            self.store.save_diagnostic(&diagnostic).await?;
            self.store.clear_quiz().await?;
            self.persisted_once = false;
            self.first_saved_at = None;
            tracing::info!("guest diagnostic stored, saved quiz cleared");
        }

        Ok(SubmitOutcome {
            quiz_id: outcome.quiz_id.or_else(|| self.quiz_id.clone()),
            report: outcome.report,
        })
    }

    /// Mirror the live state into the store under the persistence rule.
    ///
    /// Never fails the calling mutation: store trouble is logged and the
    /// in-memory state stays authoritative.
    async fn flush(&mut self) {
        if !self.guest {
            return;
        }

        if answered_count(&self.responses) == 0 {
            // Never leave a zero-progress snapshot behind, but only delete
            // what this session itself persisted; an earlier session's
            // snapshot must stay offerable for resume.
            if self.persisted_once {
                if let Err(err) = self.store.clear_quiz().await {
                    tracing::warn!(error = %err, "failed to clear emptied quiz snapshot");
                    return;
                }
                self.persisted_once = false;
                self.first_saved_at = None;
            }
            return;
        }

        let created_at = match self.first_saved_at {
            Some(at) => at,
            // First persist of this session: if an earlier snapshot is
            // still stored, its creation timestamp wins.
            None => match self.store.load_quiz().await {
                Ok(Some(prior)) => prior.created_at,
                Ok(None) => self.clock.now(),
                Err(err) => {
                    tracing::warn!(error = %err, "could not read prior snapshot");
                    self.clock.now()
                }
            },
        };

        let snapshot = QuizSnapshot {
            questions: self.questions.clone(),
            current_index: self.current_index,
            responses: self.responses.clone(),
            time_spent: self.time_spent.clone(),
            started_at: self.started_at,
            created_at,
        };

        match self.store.save_quiz(&snapshot).await {
            Ok(()) => {
                self.first_saved_at = Some(created_at);
                self.persisted_once = true;
            }
            Err(err) => tracing::warn!(error = %err, "failed to save quiz snapshot"),
        }
    }
}

impl fmt::Debug for QuizSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSessionManager")
            .field("questions_len", &self.questions.len())
            .field("current_index", &self.current_index)
            .field("answered", &self.answered_count())
            .field("started_at", &self.started_at)
            .field("guest", &self.guest)
            .field("quiz_id", &self.quiz_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use studygap_core::model::{AnswerOption, UserProfile};
    use studygap_core::time::{fixed_clock, fixed_now};

    use crate::backend::{AnalyzeOutcome, SaveDiagnosticRequest, SaveOutcome};
    use crate::error::ApiError;

    #[derive(Default)]
    struct FakeBackend {
        reject_unauthorized: bool,
        issued_quiz_id: Option<&'static str>,
        analyze_requests: Mutex<Vec<AnalyzeRequest>>,
    }

    #[async_trait]
    impl QuizBackend for FakeBackend {
        async fn fetch_questions(&self, total: u32) -> Result<Vec<QuizQuestion>, ApiError> {
            Ok((0..total).map(|i| build_question(&format!("q{}", i + 1))).collect())
        }

        async fn start_quiz(&self, _total_questions: u32) -> Result<Option<QuizId>, ApiError> {
            Ok(self.issued_quiz_id.map(QuizId::new))
        }

        async fn analyze_diagnostic(
            &self,
            request: &AnalyzeRequest,
        ) -> Result<AnalyzeOutcome, ApiError> {
            if self.reject_unauthorized {
                return Err(ApiError::Status {
                    status: StatusCode::UNAUTHORIZED,
                    body: "authentication required".into(),
                });
            }
            self.analyze_requests.lock().unwrap().push(request.clone());
            Ok(AnalyzeOutcome {
                report: DiagnosticReport::default(),
                quiz_id: self.issued_quiz_id.map(QuizId::new),
            })
        }

        async fn save_diagnostic(
            &self,
            _request: &SaveDiagnosticRequest,
        ) -> Result<SaveOutcome, ApiError> {
            Ok(SaveOutcome { quiz_id: None })
        }

        async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
            Ok(UserProfile::default())
        }
    }

    fn build_question(id: &str) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(id),
            topic: "Algebra".into(),
            question_text: "?".into(),
            option_a: "1".into(),
            option_b: "2".into(),
            option_c: "3".into(),
            option_d: "4".into(),
            correct_answer: AnswerOption::B,
            difficulty: String::new(),
            subtopic: None,
        }
    }

    fn questions(n: usize) -> Vec<QuizQuestion> {
        (0..n).map(|i| build_question(&format!("q{}", i + 1))).collect()
    }

    fn guest_manager(
        store: &SessionStore,
        backend: Arc<FakeBackend>,
        n: usize,
    ) -> QuizSessionManager {
        QuizSessionManager::new(fixed_clock(), store.clone(), backend, questions(n), true).unwrap()
    }

    fn answer(option: AnswerOption) -> ResponsePatch {
        ResponsePatch::answer(option, AnswerOption::B)
    }

    #[test]
    fn empty_question_set_is_rejected() {
        let store = SessionStore::in_memory();
        let err = QuizSessionManager::new(
            fixed_clock(),
            store,
            Arc::new(FakeBackend::default()),
            Vec::new(),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, QuizError::NoQuestions));
    }

    #[tokio::test]
    async fn answering_persists_a_snapshot() {
        let store = SessionStore::in_memory();
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;

        let snapshot = store.load_quiz().await.unwrap().expect("snapshot saved");
        assert_eq!(snapshot.answered_count(), 1);
        assert_eq!(snapshot.created_at, fixed_now());
    }

    #[tokio::test]
    async fn zero_progress_is_never_persisted() {
        let store = SessionStore::in_memory();
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);

        // Navigation and time tracking alone are not progress.
        manager.go_to_question(2).await;
        manager.update_time_spent(&QuestionId::new("q1"), 30).await;

        assert!(store.load_quiz().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn emptied_session_deletes_its_own_snapshot() {
        let store = SessionStore::in_memory();
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        assert!(store.load_quiz().await.unwrap().is_some());

        manager.reset().await.unwrap();
        assert!(store.load_quiz().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn creation_timestamp_survives_resaves() {
        let store = SessionStore::in_memory();
        let mut clock = fixed_clock();
        let mut manager = QuizSessionManager::new(
            clock,
            store.clone(),
            Arc::new(FakeBackend::default()),
            questions(3),
            true,
        )
        .unwrap();

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        let first = store.load_quiz().await.unwrap().unwrap();

        clock.advance(Duration::minutes(10));
        manager.clock = clock;
        manager
            .update_response(&QuestionId::new("q2"), answer(AnswerOption::C))
            .await;

        let second = store.load_quiz().await.unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.answered_count(), 2);
    }

    #[tokio::test]
    async fn creation_timestamp_inherited_from_prior_snapshot() {
        let store = SessionStore::in_memory();

        // A previous page load persisted a snapshot ten minutes ago.
        let earlier = fixed_now() - Duration::minutes(10);
        let mut prior_manager = QuizSessionManager::new(
            Clock::fixed(earlier),
            store.clone(),
            Arc::new(FakeBackend::default()),
            questions(3),
            true,
        )
        .unwrap();
        prior_manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;

        // A fresh manager over the same store keeps that creation time.
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);
        manager
            .update_response(&QuestionId::new("q2"), answer(AnswerOption::C))
            .await;

        let snapshot = store.load_quiz().await.unwrap().unwrap();
        assert_eq!(snapshot.created_at, earlier);
    }

    #[tokio::test]
    async fn go_to_question_clamps_into_range() {
        let store = SessionStore::in_memory();
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);

        manager.go_to_question(99).await;
        assert_eq!(manager.current_index(), 2);
        manager.go_to_question(0).await;
        assert_eq!(manager.current_index(), 0);
    }

    #[tokio::test]
    async fn submission_covers_every_question() {
        let store = SessionStore::in_memory();
        let backend = Arc::new(FakeBackend::default());
        let mut manager = guest_manager(&store, Arc::clone(&backend), 15);

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        manager
            .update_response(&QuestionId::new("q3"), answer(AnswerOption::D))
            .await;
        manager.update_time_spent(&QuestionId::new("q3"), 25).await;

        manager.submit().await.unwrap();

        let requests = backend.analyze_requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.total_questions, 15);
        assert_eq!(request.questions_list.len(), 15);

        // Unanswered questions default to the first option with no time.
        let untouched = &request.questions_list[1];
        assert_eq!(untouched.student_answer, Some(AnswerOption::A));
        assert_eq!(untouched.time_spent_seconds, 0);
        assert!(!untouched.is_correct);

        let timed = &request.questions_list[2];
        assert_eq!(timed.time_spent_seconds, 25);
    }

    #[tokio::test]
    async fn guest_submission_stores_diagnostic_and_clears_quiz() {
        let store = SessionStore::in_memory();
        let backend = Arc::new(FakeBackend {
            issued_quiz_id: Some("quiz-1"),
            ..FakeBackend::default()
        });
        let mut manager = guest_manager(&store, backend, 3);

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        assert!(store.load_quiz().await.unwrap().is_some());

        let outcome = manager.submit().await.unwrap();
        assert_eq!(outcome.quiz_id, Some(QuizId::new("quiz-1")));
        assert!(store.load_quiz().await.unwrap().is_none());
        assert!(store.load_diagnostic().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn guest_401_becomes_auth_required_and_keeps_progress() {
        let store = SessionStore::in_memory();
        let backend = Arc::new(FakeBackend {
            reject_unauthorized: true,
            ..FakeBackend::default()
        });
        let mut manager = guest_manager(&store, backend, 3);

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;

        let err = manager.submit().await.unwrap_err();
        assert!(matches!(err, QuizError::AuthRequired { .. }));
        // Progress survives so the user can register and come back.
        assert!(store.load_quiz().await.unwrap().is_some());
        assert!(store.load_diagnostic().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_filters_unknown_questions_and_keeps_timestamps() {
        let store = SessionStore::in_memory();

        let mut earlier_manager = QuizSessionManager::new(
            Clock::fixed(fixed_now() - Duration::minutes(30)),
            store.clone(),
            Arc::new(FakeBackend::default()),
            questions(4),
            true,
        )
        .unwrap();
        earlier_manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        earlier_manager
            .update_response(&QuestionId::new("q4"), answer(AnswerOption::C))
            .await;
        earlier_manager.go_to_question(3).await;

        // The question source now serves only three questions.
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);
        assert!(manager.restore_from_store().await.unwrap());

        assert_eq!(manager.answered_count(), 1);
        assert_eq!(manager.current_index(), 2);
        assert_eq!(manager.started_at(), fixed_now() - Duration::minutes(30));
    }

    #[tokio::test]
    async fn restore_with_empty_store_is_a_noop() {
        let store = SessionStore::in_memory();
        let mut manager = guest_manager(&store, Arc::new(FakeBackend::default()), 3);
        assert!(!manager.restore_from_store().await.unwrap());
        assert_eq!(manager.answered_count(), 0);
    }

    #[tokio::test]
    async fn authenticated_attempts_never_touch_the_guest_slot() {
        let store = SessionStore::in_memory();
        let backend = Arc::new(FakeBackend {
            issued_quiz_id: Some("quiz-7"),
            ..FakeBackend::default()
        });
        let mut manager = QuizSessionManager::begin(
            fixed_clock(),
            store.clone(),
            backend,
            3,
            false,
        )
        .await
        .unwrap();
        assert_eq!(manager.quiz_id(), Some(&QuizId::new("quiz-7")));

        manager
            .update_response(&QuestionId::new("q1"), answer(AnswerOption::B))
            .await;
        assert!(store.load_quiz().await.unwrap().is_none());

        manager.submit().await.unwrap();
        assert!(store.load_diagnostic().await.unwrap().is_none());
    }
}
