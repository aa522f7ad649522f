#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod quiz;

pub use studygap_core::Clock;

pub use backend::{
    AnalyzeOutcome, AnalyzeRequest, QuizBackend, ReconciledQuestion, SaveDiagnosticRequest,
    SaveOutcome,
};
pub use config::ApiConfig;
pub use error::{ApiError, QuizError, ReconcileError};
pub use http::HttpQuizBackend;

pub use quiz::{
    QuestionTimer, QuizProgress, QuizSessionManager, ReconcileOutcome, ReconciliationService,
    ResumeGate, ResumeSummary, SubmitOutcome, TimerFlush,
};
