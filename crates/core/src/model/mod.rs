mod diagnostic;
mod ids;
mod profile;
pub mod question;
mod response;
mod snapshot;

pub use diagnostic::{
    CompletedQuiz, DiagnosticReport, GuestDiagnostic, OverallPerformance, PredictedScore,
    Recommendation, RootCauseAnalysis, StudyPlan, StudyWeek, TopicBreakdown,
};
pub use ids::{QuestionId, QuizId};
pub use profile::UserProfile;
pub use question::{AnswerOption, QuizQuestion};
pub use response::{DEFAULT_CONFIDENCE, QuestionResponse, ResponsePatch};
pub use snapshot::{QuizSnapshot, RestoredProgress, answered_count};
