use serde::{Deserialize, Serialize};

use crate::model::question::lenient_answer;
use crate::model::{AnswerOption, QuizQuestion};

/// Confidence rating fallback used when a stored rating is missing or out
/// of range.
pub const DEFAULT_CONFIDENCE: u8 = 3;

/// A student's response to a single question.
///
/// A response object may exist without the question being answered: the
/// question counts as answered only when `student_answer` holds a valid
/// option label (see [`AnswerOption::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// Position of the question in the attempt, starting at 1.
    pub id: u32,
    pub topic: String,
    #[serde(default, deserialize_with = "lenient_answer")]
    pub student_answer: Option<AnswerOption>,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub time_spent_seconds: u32,
}

impl QuestionResponse {
    /// Builds the default response seeded when a question is first touched.
    ///
    /// The answer defaults to the first option, mirroring the submission
    /// default for questions the student never reached.
    #[must_use]
    pub fn seeded(sequence: u32, question: &QuizQuestion) -> Self {
        Self {
            id: sequence,
            topic: question.topic.clone(),
            student_answer: Some(AnswerOption::FIRST),
            correct_answer: question.correct_answer,
            is_correct: AnswerOption::FIRST == question.correct_answer,
            confidence: None,
            explanation: String::new(),
            time_spent_seconds: 0,
        }
    }

    /// Builds the placeholder emitted for a question with no response at
    /// submission time: first option, zero time spent.
    #[must_use]
    pub fn unanswered(sequence: u32, question: &QuizQuestion) -> Self {
        let mut response = Self::seeded(sequence, question);
        response.is_correct = false;
        response
    }

    /// True iff the student picked one of the four valid option labels.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.student_answer.is_some()
    }

    /// Confidence clamped into `1..=5`, defaulting when absent.
    #[must_use]
    pub fn clamped_confidence(&self) -> u8 {
        match self.confidence {
            Some(c) if (1..=5).contains(&c) => c,
            _ => DEFAULT_CONFIDENCE,
        }
    }
}

/// Partial update merged into an existing (or freshly seeded) response.
///
/// Absent fields leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePatch {
    pub student_answer: Option<AnswerOption>,
    pub is_correct: Option<bool>,
    pub confidence: Option<u8>,
    pub explanation: Option<String>,
    pub time_spent_seconds: Option<u32>,
}

impl ResponsePatch {
    /// Patch recording an answer pick, with correctness derived against the
    /// question's correct option.
    #[must_use]
    pub fn answer(option: AnswerOption, correct: AnswerOption) -> Self {
        Self {
            student_answer: Some(option),
            is_correct: Some(option == correct),
            ..Self::default()
        }
    }

    /// Patch recording only a confidence rating.
    #[must_use]
    pub fn confidence(rating: u8) -> Self {
        Self {
            confidence: Some(rating),
            ..Self::default()
        }
    }

    /// Applies the patch, overwriting only the fields that are present.
    pub fn apply(self, response: &mut QuestionResponse) {
        if let Some(answer) = self.student_answer {
            response.student_answer = Some(answer);
        }
        if let Some(is_correct) = self.is_correct {
            response.is_correct = is_correct;
        }
        if let Some(confidence) = self.confidence {
            response.confidence = Some(confidence);
        }
        if let Some(explanation) = self.explanation {
            response.explanation = explanation;
        }
        if let Some(seconds) = self.time_spent_seconds {
            response.time_spent_seconds = seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn build_question(id: &str, correct: AnswerOption) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(id),
            topic: "Algebra".into(),
            question_text: "2 + 2?".into(),
            option_a: "3".into(),
            option_b: "4".into(),
            option_c: "5".into(),
            option_d: "6".into(),
            correct_answer: correct,
            difficulty: "easy".into(),
            subtopic: None,
        }
    }

    #[test]
    fn seeded_response_defaults_to_first_option() {
        let question = build_question("q1", AnswerOption::B);
        let response = QuestionResponse::seeded(1, &question);
        assert_eq!(response.student_answer, Some(AnswerOption::A));
        assert!(!response.is_correct);
        assert!(response.is_answered());
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let question = build_question("q1", AnswerOption::B);
        let mut response = QuestionResponse::seeded(1, &question);
        ResponsePatch::answer(AnswerOption::B, question.correct_answer).apply(&mut response);
        assert_eq!(response.student_answer, Some(AnswerOption::B));
        assert!(response.is_correct);

        ResponsePatch::confidence(5).apply(&mut response);
        assert_eq!(response.student_answer, Some(AnswerOption::B));
        assert_eq!(response.confidence, Some(5));
    }

    #[test]
    fn clamped_confidence_defaults_out_of_range() {
        let question = build_question("q1", AnswerOption::A);
        let mut response = QuestionResponse::seeded(1, &question);
        assert_eq!(response.clamped_confidence(), DEFAULT_CONFIDENCE);
        response.confidence = Some(9);
        assert_eq!(response.clamped_confidence(), DEFAULT_CONFIDENCE);
        response.confidence = Some(2);
        assert_eq!(response.clamped_confidence(), 2);
    }

    #[test]
    fn malformed_stored_answer_reads_back_as_absent() {
        let json = r#"{
            "id": 1,
            "topic": "Algebra",
            "student_answer": "",
            "correct_answer": "B",
            "is_correct": false
        }"#;
        let response: QuestionResponse = serde_json::from_str(json).unwrap();
        assert!(!response.is_answered());
    }
}
