use std::env;

/// Fallback used when no base URL is configured, matching the local
/// development backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Backend API location and endpoint builders.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `STUDYGAP_API_BASE_URL`, falling back to the local default.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("STUDYGAP_API_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Self::new(base_url)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Fetch N quiz questions.
    #[must_use]
    pub fn questions_url(&self, total: u32) -> String {
        format!("{}?total={total}", self.join("quiz/questions"))
    }

    /// Open a durable quiz for an authenticated user.
    #[must_use]
    pub fn quiz_start_url(&self) -> String {
        self.join("quiz/start")
    }

    /// Submit answers for analysis.
    #[must_use]
    pub fn analyze_diagnostic_url(&self) -> String {
        self.join("ai/analyze-diagnostic")
    }

    /// Save a guest diagnostic under an authenticated identity.
    #[must_use]
    pub fn save_diagnostic_url(&self) -> String {
        self.join("ai/save-diagnostic")
    }

    /// Current user's profile.
    #[must_use]
    pub fn profile_url(&self) -> String {
        self.join("users/me")
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
