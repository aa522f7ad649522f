use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use studygap_core::model::{QuizId, QuizQuestion, UserProfile};

use crate::backend::{
    AnalyzeOutcome, AnalyzeRequest, QuizBackend, SaveDiagnosticRequest, SaveOutcome,
    normalize_diagnostic_payload, normalize_save_payload,
};
use crate::config::ApiConfig;
use crate::error::ApiError;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_BASE_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Transient statuses worth another attempt: timeout, rate limit, server
/// errors.
fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff with jitter, honoring an explicit server wait.
///
/// `retry_after` (seconds) comes from the `Retry-After` header on 429/503
/// responses and takes precedence over the computed delay. Jitter spreads
/// retries out so simultaneous clients do not stampede.
fn backoff_delay(attempt: u32, retry_after: Option<u64>) -> Duration {
    if let Some(seconds) = retry_after {
        return Duration::from_millis(seconds.saturating_mul(1_000).min(MAX_RETRY_DELAY_MS));
    }

    let exponential = RETRY_DELAY_BASE_MS.saturating_mul(1_u64 << attempt.min(16));
    let jitter = rand::rng().random_range(0.0..0.25) * exponential as f64;
    Duration::from_millis((exponential + jitter as u64).min(MAX_RETRY_DELAY_MS))
}

fn retry_after_seconds(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .filter(|&seconds| seconds > 0)
}

/// Backend client over HTTP.
///
/// Carries an optional bearer token; its absence is what makes a request
/// anonymous. Transient failures are retried a bounded number of times,
/// everything else surfaces to the caller untouched.
#[derive(Clone)]
pub struct HttpQuizBackend {
    client: Client,
    config: ApiConfig,
    bearer_token: Option<String>,
}

impl HttpQuizBackend {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            bearer_token: None,
        }
    }

    /// Reads the API location from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    /// Attach the session token issued by the auth provider.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// True iff requests go out without an authenticated identity.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.bearer_token.is_none()
    }

    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.request(method.clone(), url);
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if is_retryable(status) && attempt < MAX_RETRIES {
                let retry_after = retry_after_seconds(&response);
                let delay = backoff_delay(attempt, retry_after);
                attempt += 1;
                tracing::warn!(
                    %status,
                    url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if is_retryable(status) {
                return Err(ApiError::RetriesExhausted {
                    attempts: MAX_RETRIES,
                    status,
                });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let response = self.send_with_retry(Method::GET, url, None).await?;
        Ok(response.json().await?)
    }

    async fn post_json<T: Serialize>(&self, url: &str, payload: &T) -> Result<Value, ApiError> {
        let body = serde_json::to_value(payload).map_err(|e| ApiError::Encode(e.to_string()))?;
        let response = self.send_with_retry(Method::POST, url, Some(&body)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QuizBackend for HttpQuizBackend {
    async fn fetch_questions(&self, total: u32) -> Result<Vec<QuizQuestion>, ApiError> {
        let body = self.get_json(&self.config.questions_url(total)).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn start_quiz(&self, total_questions: u32) -> Result<Option<QuizId>, ApiError> {
        let payload = serde_json::json!({ "total_questions": total_questions });
        let body = self
            .post_json(&self.config.quiz_start_url(), &payload)
            .await?;
        Ok(body
            .get("quiz_id")
            .and_then(Value::as_str)
            .map(QuizId::new))
    }

    async fn analyze_diagnostic(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeOutcome, ApiError> {
        let body = self
            .post_json(&self.config.analyze_diagnostic_url(), request)
            .await?;
        normalize_diagnostic_payload(body)
    }

    async fn save_diagnostic(
        &self,
        request: &SaveDiagnosticRequest,
    ) -> Result<SaveOutcome, ApiError> {
        let body = self
            .post_json(&self.config.save_diagnostic_url(), request)
            .await?;
        Ok(normalize_save_payload(&body))
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let body = self.get_json(&self.config.profile_url()).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_match_the_policy() {
        for code in [408_u16, 429, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [400_u16, 401, 403, 404, 409] {
            assert!(!is_retryable(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn backoff_grows_exponentially_within_bounds() {
        for attempt in 0..4 {
            let base = RETRY_DELAY_BASE_MS * (1 << attempt);
            let delay = backoff_delay(attempt, None).as_millis() as u64;
            assert!(delay >= base, "attempt {attempt}: {delay} < {base}");
            assert!(delay <= base + base / 4, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn backoff_honors_retry_after_up_to_the_cap() {
        assert_eq!(backoff_delay(0, Some(2)), Duration::from_secs(2));
        assert_eq!(backoff_delay(5, Some(600)), Duration::from_secs(30));
    }

    #[test]
    fn guest_identity_is_the_absence_of_a_token() {
        let backend = HttpQuizBackend::new(ApiConfig::default());
        assert!(backend.is_guest());
        let backend = backend.with_bearer_token("jwt");
        assert!(!backend.is_guest());
    }
}
