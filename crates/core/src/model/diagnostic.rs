use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{QuestionId, QuestionResponse, QuizId, QuizQuestion};

/// Aggregate accuracy and pacing figures for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallPerformance {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub avg_confidence: f64,
    #[serde(default)]
    pub time_per_question: f64,
}

/// Per-topic slice of the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub topic: String,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub questions_attempted: u32,
}

/// Distribution of error causes across the attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    #[serde(default)]
    pub primary_weakness: String,
    #[serde(default)]
    pub error_distribution: HashMap<String, u32>,
}

/// Score projection with its confidence band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedScore {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub confidence_interval: String,
}

/// One week of the generated study plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyWeek {
    #[serde(default)]
    pub week: u32,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub study_hours: f64,
    #[serde(default)]
    pub key_activities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    #[serde(default)]
    pub weekly_schedule: Vec<StudyWeek>,
}

/// A prioritized next step suggested by the analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub rationale: String,
}

/// The analysis object produced by the diagnostic collaborator.
///
/// Every field is lenient: the analysis service evolves independently of
/// this client, so absent sections deserialize to their defaults rather
/// than failing the whole report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<QuizId>,
    #[serde(default)]
    pub overall_performance: OverallPerformance,
    #[serde(default)]
    pub topic_breakdown: Vec<TopicBreakdown>,
    #[serde(default)]
    pub root_cause_analysis: RootCauseAnalysis,
    #[serde(default)]
    pub predicted_score: PredictedScore,
    #[serde(default)]
    pub study_plan: StudyPlan,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// The quiz material a diagnostic was computed from, kept alongside the
/// report so a later reconciliation can rebuild the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedQuiz {
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub responses: HashMap<QuestionId, QuestionResponse>,
    /// Wall-clock minutes the whole attempt took.
    #[serde(default)]
    pub total_time_minutes: f64,
}

/// A guest's completed diagnostic: the single durable record written when
/// an anonymous attempt is submitted, and consumed once on account
/// creation or login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestDiagnostic {
    pub diagnostic: DiagnosticReport,
    pub quiz: CompletedQuiz,
    pub saved_at: DateTime<Utc>,
}
