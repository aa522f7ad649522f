use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use studygap_core::model::{GuestDiagnostic, QuizId, QuizSnapshot};

/// Errors surfaced by session-store backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Minimal durable key-value contract the session store is built on.
///
/// Business logic never touches a concrete store directly; it goes through
/// [`SessionStore`], which is handed an implementation of this trait. Tests
/// substitute [`InMemoryStore`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value for a key, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value for a key wholesale.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Well-known slot keys.
///
/// Two logical slots plus two single-value markers; the slot set is an
/// implementation detail of this crate, not a public contract.
pub mod keys {
    /// In-progress anonymous quiz snapshot.
    pub const GUEST_QUIZ: &str = "guest_quiz";
    /// Completed-but-unsaved anonymous diagnostic.
    pub const GUEST_DIAGNOSTIC: &str = "guest_diagnostic";
    /// Most recent durable quiz id issued by the backend.
    pub const LATEST_QUIZ_ID: &str = "latest_quiz_id";
    /// Whether the guest-mode banner was dismissed.
    pub const GUEST_BANNER_DISMISSED: &str = "guest_banner_dismissed";
}

/// Typed wrapper over a [`KeyValueStore`] exposing the session slots.
///
/// Writes are whole-value replacements. Reads are lenient: a stored value
/// that no longer parses is logged and treated as absent, never bubbled up
/// to the caller as an error.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by a process-local map, for tests and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    async fn read_slot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(slot = key, error = %err, "discarding malformed stored value");
                Ok(None)
            }
        }
    }

    async fn write_slot<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.backend.set(key, &raw).await
    }

    /// Persist the in-progress quiz snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization or the backend write fails.
    pub async fn save_quiz(&self, snapshot: &QuizSnapshot) -> Result<(), StoreError> {
        self.write_slot(keys::GUEST_QUIZ, snapshot).await
    }

    /// Load the in-progress quiz snapshot, `None` if absent or malformed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for backend read failures.
    pub async fn load_quiz(&self) -> Result<Option<QuizSnapshot>, StoreError> {
        self.read_slot(keys::GUEST_QUIZ).await
    }

    /// Delete the in-progress quiz snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn clear_quiz(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::GUEST_QUIZ).await
    }

    /// Persist the completed guest diagnostic.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization or the backend write fails.
    pub async fn save_diagnostic(&self, diagnostic: &GuestDiagnostic) -> Result<(), StoreError> {
        self.write_slot(keys::GUEST_DIAGNOSTIC, diagnostic).await
    }

    /// Load the completed guest diagnostic, `None` if absent or malformed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for backend read failures.
    pub async fn load_diagnostic(&self) -> Result<Option<GuestDiagnostic>, StoreError> {
        self.read_slot(keys::GUEST_DIAGNOSTIC).await
    }

    /// Delete the completed guest diagnostic.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn clear_diagnostic(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::GUEST_DIAGNOSTIC).await
    }

    /// The most recent durable quiz id, if one was recorded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for backend read failures.
    pub async fn latest_quiz_id(&self) -> Result<Option<QuizId>, StoreError> {
        Ok(self
            .backend
            .get(keys::LATEST_QUIZ_ID)
            .await?
            .filter(|raw| !raw.trim().is_empty())
            .map(QuizId::new))
    }

    /// Record the most recent durable quiz id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn set_latest_quiz_id(&self, id: &QuizId) -> Result<(), StoreError> {
        self.backend.set(keys::LATEST_QUIZ_ID, id.as_str()).await
    }

    /// Forget the recorded quiz id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn clear_latest_quiz_id(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::LATEST_QUIZ_ID).await
    }

    /// Whether the guest-mode banner was dismissed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for backend read failures.
    pub async fn is_banner_dismissed(&self) -> Result<bool, StoreError> {
        Ok(self
            .backend
            .get(keys::GUEST_BANNER_DISMISSED)
            .await?
            .is_some())
    }

    /// Mark the guest-mode banner as dismissed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn dismiss_banner(&self) -> Result<(), StoreError> {
        self.backend.set(keys::GUEST_BANNER_DISMISSED, "1").await
    }

    /// Reset the banner-dismissed marker.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub async fn clear_banner_dismissed(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::GUEST_BANNER_DISMISSED).await
    }
}

/// Process-local key-value store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use studygap_core::model::{
        AnswerOption, QuestionId, QuestionResponse, QuizQuestion, QuizSnapshot, ResponsePatch,
    };
    use studygap_core::time::fixed_now;

    fn build_question(id: &str) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(id),
            topic: "Geometry".into(),
            question_text: "?".into(),
            option_a: "1".into(),
            option_b: "2".into(),
            option_c: "3".into(),
            option_d: "4".into(),
            correct_answer: AnswerOption::C,
            difficulty: String::new(),
            subtopic: None,
        }
    }

    fn build_snapshot() -> QuizSnapshot {
        let question = build_question("q1");
        let mut response = QuestionResponse::seeded(1, &question);
        ResponsePatch::answer(AnswerOption::C, question.correct_answer).apply(&mut response);
        let mut responses = StdHashMap::new();
        responses.insert(question.id.clone(), response);
        QuizSnapshot {
            questions: vec![question, build_question("q2")],
            current_index: 1,
            responses,
            time_spent: StdHashMap::new(),
            started_at: fixed_now(),
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn quiz_slot_roundtrips() {
        let store = SessionStore::in_memory();
        assert!(store.load_quiz().await.unwrap().is_none());

        let snapshot = build_snapshot();
        store.save_quiz(&snapshot).await.unwrap();
        let loaded = store.load_quiz().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);

        store.clear_quiz().await.unwrap();
        assert!(store.load_quiz().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_slot_reads_as_absent() {
        let backend = Arc::new(InMemoryStore::new());
        backend.set(keys::GUEST_QUIZ, "{not json").await.unwrap();

        let store = SessionStore::new(backend);
        assert!(store.load_quiz().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn slot_with_missing_fields_reads_as_absent() {
        let backend = Arc::new(InMemoryStore::new());
        // Valid JSON, but not a snapshot: no questions, no index.
        backend
            .set(keys::GUEST_QUIZ, r#"{"responses": {}}"#)
            .await
            .unwrap();

        let store = SessionStore::new(backend);
        assert!(store.load_quiz().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn markers_roundtrip() {
        let store = SessionStore::in_memory();
        assert!(store.latest_quiz_id().await.unwrap().is_none());
        assert!(!store.is_banner_dismissed().await.unwrap());

        store.set_latest_quiz_id(&QuizId::new("abc")).await.unwrap();
        store.dismiss_banner().await.unwrap();
        assert_eq!(
            store.latest_quiz_id().await.unwrap(),
            Some(QuizId::new("abc"))
        );
        assert!(store.is_banner_dismissed().await.unwrap());

        store.clear_latest_quiz_id().await.unwrap();
        store.clear_banner_dismissed().await.unwrap();
        assert!(store.latest_quiz_id().await.unwrap().is_none());
        assert!(!store.is_banner_dismissed().await.unwrap());
    }
}
