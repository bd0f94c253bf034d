//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Gift preferences a participant fills in before matching.
///
/// Matching never touches this; it must round-trip through storage
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftPreferences {
    /// Things the participant would like to receive
    #[serde(default)]
    pub likes: Vec<String>,
    /// Things to avoid
    #[serde(default)]
    pub dislikes: Vec<String>,
}

/// User record stored in users.json.
///
/// Field names are camelCase on disk and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier, assigned at creation, never reused
    pub id: u64,
    /// Login name (unique)
    pub username: String,
    /// Email address for match notifications (may be absent)
    #[serde(default)]
    pub email: Option<String>,
    /// Argon2 password hash; never exposed through the API
    pub password_hash: String,
    /// Admins manage the exchange and are excluded from matching
    #[serde(default)]
    pub is_admin: bool,
    /// Only ready non-admin users enter a matching round
    #[serde(default)]
    pub ready: bool,
    /// Id of the user this one gives a gift to, once matched
    #[serde(default)]
    pub matched_with: Option<u64>,
    /// Likes and dislikes shown to whoever draws this user
    #[serde(default)]
    pub gift_preferences: GiftPreferences,
    /// When the account was created (RFC 3339)
    #[serde(default)]
    pub created_at: String,
}

impl User {
    /// Whether this user is eligible for a matching round.
    pub fn is_participant(&self) -> bool {
        !self.is_admin && self.ready
    }

    /// Return a copy of this user with `matched_with` replaced.
    ///
    /// Matching only ever updates users through this; records are never
    /// mutated in place.
    pub fn with_matched_with(&self, matched_with: Option<u64>) -> User {
        User {
            matched_with,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "carol".to_string(),
            email: Some("carol@example.com".to_string()),
            password_hash: "$argon2id$stub".to_string(),
            is_admin: false,
            ready: true,
            matched_with: None,
            gift_preferences: GiftPreferences {
                likes: vec!["books".to_string(), "tea".to_string()],
                dislikes: vec!["socks".to_string(), "candles".to_string()],
            },
            created_at: "2025-11-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_with_matched_with_leaves_rest_untouched() {
        let user = sample_user();
        let updated = user.with_matched_with(Some(3));

        assert_eq!(updated.matched_with, Some(3));
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.gift_preferences, user.gift_preferences);
        assert_eq!(user.matched_with, None);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("isAdmin").is_some());
        assert!(json.get("matchedWith").is_some());
        assert!(json.get("giftPreferences").is_some());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        // Older files may lack optional fields entirely
        let user: User = serde_json::from_str(
            r#"{"id": 1, "username": "admin", "passwordHash": "x"}"#,
        )
        .unwrap();

        assert!(!user.is_admin);
        assert!(!user.ready);
        assert_eq!(user.matched_with, None);
        assert!(user.gift_preferences.likes.is_empty());
    }
}
