use std::sync::Arc;

use storage::SessionStore;
use studygap_core::model::{AnswerOption, DEFAULT_CONFIDENCE, QuizId, QuizSnapshot};

use crate::backend::{QuizBackend, ReconciledQuestion, SaveDiagnosticRequest};
use crate::error::ReconcileError;

/// What an authentication-transition reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The guest diagnostic was saved to the account; both guest slots are
    /// now clear.
    Saved { quiz_id: Option<QuizId> },
    /// One or both guest slots were absent; nothing was sent.
    NothingToReconcile,
    /// Nothing to carry over, so leftover guest state was dropped.
    ClearedStaleGuestData,
}

/// Moves a guest's completed diagnostic into their account, once, at the
/// moment an anonymous session becomes an authenticated one.
///
/// Guest data is deleted only after the reconciling submission succeeds,
/// so a failure loses nothing and the next login retries.
#[derive(Clone)]
pub struct ReconciliationService {
    store: SessionStore,
    backend: Arc<dyn QuizBackend>,
    subject: String,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(store: SessionStore, backend: Arc<dyn QuizBackend>) -> Self {
        Self {
            store,
            backend,
            subject: "Mathematics".into(),
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Reconcile the stored guest diagnostic into the current account.
    ///
    /// Reads both guest slots; if either is absent there is nothing to do.
    /// Otherwise rebuilds the submission from the quiz snapshot (sequential
    /// ids from array position), validates it locally, submits it, records
    /// the returned durable quiz id, and clears the guest slots.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::EmptySubmission` before any network call if
    /// the rebuilt list is empty. Collaborator and store failures propagate
    /// with the guest slots left intact.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(snapshot) = self.store.load_quiz().await? else {
            tracing::debug!("no guest quiz stored, nothing to reconcile");
            return Ok(ReconcileOutcome::NothingToReconcile);
        };
        let Some(guest) = self.store.load_diagnostic().await? else {
            tracing::debug!("no guest diagnostic stored, nothing to reconcile");
            return Ok(ReconcileOutcome::NothingToReconcile);
        };

        let questions_list = build_questions_list(&snapshot);
        if questions_list.is_empty() {
            return Err(ReconcileError::EmptySubmission);
        }

        let time_taken = if guest.quiz.total_time_minutes > 0.0 {
            guest.quiz.total_time_minutes
        } else {
            0.0
        };

        let request = SaveDiagnosticRequest {
            subject: self.subject.clone(),
            total_questions: questions_list.len() as u32,
            time_taken,
            questions_list,
            diagnostic: guest.diagnostic,
        };

        let outcome = self.backend.save_diagnostic(&request).await?;

        if let Some(quiz_id) = &outcome.quiz_id {
            self.store.set_latest_quiz_id(quiz_id).await?;
        }
        self.store.clear_quiz().await?;
        self.store.clear_diagnostic().await?;
        self.store.clear_banner_dismissed().await?;
        tracing::info!(
            quiz_id = outcome.quiz_id.as_ref().map(QuizId::as_str),
            "guest diagnostic reconciled into account"
        );

        Ok(ReconcileOutcome::Saved {
            quiz_id: outcome.quiz_id,
        })
    }

    /// Entry point for a login or registration success.
    ///
    /// Reconciles when both guest slots are populated; otherwise clears
    /// whatever guest remnants are lying around, including the recorded
    /// quiz id, which may belong to a previous user of this browser.
    ///
    /// # Errors
    ///
    /// Same as [`reconcile`](Self::reconcile); cleanup failures also
    /// propagate.
    pub async fn on_authenticated(&self) -> Result<ReconcileOutcome, ReconcileError> {
        let has_quiz = self.store.load_quiz().await?.is_some();
        let has_diagnostic = self.store.load_diagnostic().await?.is_some();
        if has_quiz && has_diagnostic {
            return self.reconcile().await;
        }

        self.store.clear_quiz().await?;
        self.store.clear_diagnostic().await?;
        self.store.clear_banner_dismissed().await?;
        self.store.clear_latest_quiz_id().await?;
        tracing::debug!("no guest diagnostic to reconcile, cleared stale guest data");
        Ok(ReconcileOutcome::ClearedStaleGuestData)
    }
}

/// Rebuild the submission list from the snapshot's question order.
///
/// Submitted records carry sequential integer ids (1, 2, 3, …) derived
/// from array position; the question source's opaque id is dropped because
/// the submission schema wants small positive integers, and position makes
/// the derivation deterministic.
fn build_questions_list(snapshot: &QuizSnapshot) -> Vec<ReconciledQuestion> {
    snapshot
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let sequence = index as u32 + 1;
            let fallback_seconds = snapshot.time_spent.get(&question.id).copied().unwrap_or(0);
            match snapshot.responses.get(&question.id) {
                Some(response) => ReconciledQuestion {
                    id: sequence,
                    topic: if response.topic.is_empty() {
                        question.topic.clone()
                    } else {
                        response.topic.clone()
                    },
                    student_answer: response.student_answer.unwrap_or(AnswerOption::FIRST),
                    correct_answer: response.correct_answer,
                    // Stored correctness wins; see the open-question note in
                    // DESIGN.md.
                    is_correct: response.is_correct,
                    confidence: response.clamped_confidence(),
                    explanation: response.explanation.clone(),
                    time_spent_seconds: if response.time_spent_seconds > 0 {
                        response.time_spent_seconds
                    } else {
                        fallback_seconds
                    },
                },
                None => ReconciledQuestion {
                    id: sequence,
                    topic: question.topic.clone(),
                    student_answer: AnswerOption::FIRST,
                    correct_answer: question.correct_answer,
                    is_correct: AnswerOption::FIRST == question.correct_answer,
                    confidence: DEFAULT_CONFIDENCE,
                    explanation: String::new(),
                    time_spent_seconds: fallback_seconds,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use studygap_core::model::{
        QuestionId, QuestionResponse, QuizQuestion, ResponsePatch,
    };
    use studygap_core::time::fixed_now;

    fn build_question(id: &str, topic: &str, correct: AnswerOption) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(id),
            topic: topic.into(),
            question_text: "?".into(),
            option_a: "1".into(),
            option_b: "2".into(),
            option_c: "3".into(),
            option_d: "4".into(),
            correct_answer: correct,
            difficulty: String::new(),
            subtopic: None,
        }
    }

    #[test]
    fn sequential_ids_follow_question_order() {
        let questions = vec![
            build_question("zebra", "Algebra", AnswerOption::A),
            build_question("apple", "Geometry", AnswerOption::B),
            build_question("mango", "Statistics", AnswerOption::C),
        ];
        let snapshot = QuizSnapshot {
            questions,
            current_index: 0,
            responses: HashMap::new(),
            time_spent: HashMap::new(),
            started_at: fixed_now(),
            created_at: fixed_now(),
        };

        let list = build_questions_list(&snapshot);
        assert_eq!(
            list.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(list[1].topic, "Geometry");
    }

    #[test]
    fn missing_response_gets_defaults_with_recomputed_correctness() {
        let question = build_question("q1", "Algebra", AnswerOption::A);
        let snapshot = QuizSnapshot {
            questions: vec![question],
            current_index: 0,
            responses: HashMap::new(),
            time_spent: HashMap::from([(QuestionId::new("q1"), 12)]),
            started_at: fixed_now(),
            created_at: fixed_now(),
        };

        let list = build_questions_list(&snapshot);
        assert_eq!(list[0].student_answer, AnswerOption::A);
        // Defaulted answer happens to match the correct option.
        assert!(list[0].is_correct);
        assert_eq!(list[0].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(list[0].time_spent_seconds, 12);
    }

    #[test]
    fn stored_response_fields_are_preferred() {
        let question = build_question("q1", "Algebra", AnswerOption::B);
        let mut response = QuestionResponse::seeded(1, &question);
        ResponsePatch::answer(AnswerOption::C, question.correct_answer).apply(&mut response);
        response.confidence = Some(9); // out of range, clamps to default
        response.explanation = "guessed".into();
        response.time_spent_seconds = 33;

        let snapshot = QuizSnapshot {
            responses: HashMap::from([(question.id.clone(), response)]),
            questions: vec![question],
            current_index: 0,
            time_spent: HashMap::new(),
            started_at: fixed_now(),
            created_at: fixed_now(),
        };

        let list = build_questions_list(&snapshot);
        assert_eq!(list[0].student_answer, AnswerOption::C);
        assert!(!list[0].is_correct);
        assert_eq!(list[0].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(list[0].explanation, "guessed");
        assert_eq!(list[0].time_spent_seconds, 33);
    }
}
