use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{QuestionId, QuestionResponse, QuizQuestion};

/// Counts the questions in a response map that are actually answered.
///
/// This is the one counting rule shared by the persistence decision, the
/// resume gate and the reconciliation validation; a response object with an
/// empty or invalid answer does not count.
#[must_use]
pub fn answered_count(responses: &HashMap<QuestionId, QuestionResponse>) -> usize {
    responses.values().filter(|r| r.is_answered()).count()
}

/// Serialized form of an in-progress quiz attempt, persisted between page
/// loads for anonymous users.
///
/// `created_at` marks when the attempt was first persisted and must survive
/// every later save of the same logical session verbatim; only the index,
/// responses and time map are refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub questions: Vec<QuizQuestion>,
    pub current_index: usize,
    #[serde(default)]
    pub responses: HashMap<QuestionId, QuestionResponse>,
    #[serde(default)]
    pub time_spent: HashMap<QuestionId, u32>,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl QuizSnapshot {
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Answered questions in this snapshot, per the shared counting rule.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        answered_count(&self.responses)
    }

    /// True iff this snapshot represents progress worth offering to resume.
    ///
    /// A snapshot with zero answered questions is either a session that
    /// never started or one that was already submitted; neither is
    /// resumable.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.answered_count() > 0
    }

    /// Projects the stored progress onto the question set currently loaded
    /// from the question source.
    ///
    /// Responses and time entries for questions that no longer exist are
    /// dropped, and the stored index is clamped into the current bounds.
    /// The stored questions may be stale; the caller keeps its own.
    #[must_use]
    pub fn project_onto(&self, current_questions: &[QuizQuestion]) -> RestoredProgress {
        let known: HashSet<&QuestionId> = current_questions.iter().map(|q| &q.id).collect();

        let responses = self
            .responses
            .iter()
            .filter(|(id, _)| known.contains(id))
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        let time_spent = self
            .time_spent
            .iter()
            .filter(|(id, _)| known.contains(id))
            .map(|(id, s)| (id.clone(), *s))
            .collect();

        let max_index = current_questions.len().saturating_sub(1);
        RestoredProgress {
            current_index: self.current_index.min(max_index),
            responses,
            time_spent,
            started_at: self.started_at,
            created_at: self.created_at,
        }
    }
}

/// Stored progress filtered and clamped against the live question set,
/// ready to be loaded back into an in-memory session.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredProgress {
    pub current_index: usize,
    pub responses: HashMap<QuestionId, QuestionResponse>,
    pub time_spent: HashMap<QuestionId, u32>,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
