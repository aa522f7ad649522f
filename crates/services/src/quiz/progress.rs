use chrono::{DateTime, Utc};

/// Aggregated view of the live attempt, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    pub current_index: usize,
}

/// What a stored session offers if resumed.
///
/// `saved_at` is the snapshot's creation timestamp, never regenerated on
/// later saves of the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeSummary {
    pub current_question: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub saved_at: DateTime<Utc>,
}
