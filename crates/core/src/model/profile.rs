use serde::{Deserialize, Serialize};

/// The backend's view of an authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub target_score: u32,
    #[serde(default)]
    pub has_diagnostic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_diagnostic_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_optional_fields() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id": "u1", "name": "Ada", "target_score": 300}"#).unwrap();
        assert_eq!(profile.target_score, 300);
        assert!(!profile.has_diagnostic);
        assert!(profile.latest_diagnostic_id.is_none());
    }
}
