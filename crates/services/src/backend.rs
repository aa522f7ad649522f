use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use studygap_core::model::{
    AnswerOption, DiagnosticReport, QuestionResponse, QuizId, QuizQuestion, UserProfile,
};

use crate::error::ApiError;

//
// ─── WIRE PAYLOADS ─────────────────────────────────────────────────────────────
//

/// Submission payload for the analyze-diagnostic endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub subject: String,
    pub total_questions: u32,
    /// Wall-clock minutes for the whole attempt.
    pub time_taken: f64,
    pub questions_list: Vec<QuestionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<QuizId>,
}

/// One record of the save-diagnostic submission.
///
/// Ids are sequential integers assigned from array position; the question
/// source's opaque id is not part of this schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledQuestion {
    pub id: u32,
    pub topic: String,
    pub student_answer: AnswerOption,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
    pub confidence: u8,
    pub explanation: String,
    pub time_spent_seconds: u32,
}

/// Payload for the save-diagnostic (guest reconciliation) endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SaveDiagnosticRequest {
    pub subject: String,
    pub total_questions: u32,
    pub time_taken: f64,
    pub questions_list: Vec<ReconciledQuestion>,
    pub diagnostic: DiagnosticReport,
}

/// Normalized result of an analyze-diagnostic call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOutcome {
    pub report: DiagnosticReport,
    pub quiz_id: Option<QuizId>,
}

/// Normalized result of a save-diagnostic call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub quiz_id: Option<QuizId>,
}

//
// ─── PAYLOAD NORMALIZATION ─────────────────────────────────────────────────────
//

/// Normalizes an analyze-diagnostic response body.
///
/// The backend answers either with the report nested under a `diagnostic`
/// key (alongside `quiz` and `responses`) or with the report at the top
/// level. This is the only place that branches on the shape; everything
/// downstream sees one [`AnalyzeOutcome`].
///
/// # Errors
///
/// Returns `ApiError::Decode` if neither shape yields a report.
pub fn normalize_diagnostic_payload(value: Value) -> Result<AnalyzeOutcome, ApiError> {
    let (report_value, outer_quiz_id) = match value {
        Value::Object(mut map) if map.contains_key("diagnostic") => {
            let quiz_id = map
                .get("quiz")
                .and_then(|quiz| quiz.get("id"))
                .and_then(Value::as_str)
                .map(QuizId::new);
            let report = map.remove("diagnostic").unwrap_or(Value::Null);
            (report, quiz_id)
        }
        other => (other, None),
    };

    let report: DiagnosticReport =
        serde_json::from_value(report_value).map_err(|e| ApiError::Decode(e.to_string()))?;
    let quiz_id = report.quiz_id.clone().or(outer_quiz_id);
    Ok(AnalyzeOutcome { report, quiz_id })
}

/// Normalizes a save-diagnostic response body: the durable quiz id may sit
/// at the top level or under `diagnostic`.
#[must_use]
pub fn normalize_save_payload(value: &Value) -> SaveOutcome {
    let quiz_id = value
        .get("quiz_id")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .get("diagnostic")
                .and_then(|d| d.get("quiz_id"))
                .and_then(Value::as_str)
        })
        .map(QuizId::new);
    SaveOutcome { quiz_id }
}

//
// ─── BACKEND SEAM ──────────────────────────────────────────────────────────────
//

/// The backend API collaborator, behind a trait so tests can script it.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Fetch `total` quiz questions.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is malformed.
    async fn fetch_questions(&self, total: u32) -> Result<Vec<QuizQuestion>, ApiError>;

    /// Open a durable quiz for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    async fn start_quiz(&self, total_questions: u32) -> Result<Option<QuizId>, ApiError>;

    /// Submit answers for diagnostic analysis.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails; a 401 for an anonymous
    /// caller surfaces here and is wrapped by the session manager.
    async fn analyze_diagnostic(&self, request: &AnalyzeRequest)
    -> Result<AnalyzeOutcome, ApiError>;

    /// Save a guest diagnostic under the now-authenticated identity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    async fn save_diagnostic(&self, request: &SaveDiagnosticRequest)
    -> Result<SaveOutcome, ApiError>;

    /// Fetch the current user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the body is malformed.
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;
}
