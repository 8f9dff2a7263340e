//! User account model.

use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// How long an emailed verification or reset code stays valid.
pub const CODE_TTL_MINUTES: i64 = 10;

/// A short numeric code delivered by email, with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeCode {
    pub code: String,
    pub expires_at: DateTime,
}

impl OneTimeCode {
    /// Wrap `code` with an expiry [`CODE_TTL_MINUTES`] from now.
    pub fn issue(code: impl Into<String>) -> Self {
        let expires = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
        Self {
            code: code.into(),
            expires_at: DateTime::from_millis(expires.timestamp_millis()),
        }
    }

    /// True if `candidate` matches and the code has not expired.
    pub fn accepts(&self, candidate: &str) -> bool {
        self.code == candidate.trim()
            && self.expires_at.timestamp_millis() > Utc::now().timestamp_millis()
    }
}

/// Two recovery questions with hashed, normalized answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityQuestions {
    pub security_question1: String,
    pub security_answer1_hash: String,
    pub security_question2: String,
    pub security_answer2_hash: String,
}

/// A registered user (stored in `users` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(default)]
    pub username: String,

    /// Lower-cased, unique.
    pub email: String,

    /// Argon2id PHC string. Empty for accounts created before hashing,
    /// which never match and must go through a reset.
    #[serde(default)]
    pub password_hash: String,

    #[serde(default, flatten, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityQuestions>,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<OneTimeCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_code: Option<OneTimeCode>,

    #[serde(default)]
    pub credits: i64,

    #[serde(default)]
    pub upload_count: i64,

    #[serde(default)]
    pub uploaded_notes: Vec<ObjectId>,

    #[serde(default)]
    pub joined_channels: Vec<ObjectId>,

    /// Receive an email when a note is uploaded to a joined channel.
    #[serde(default = "default_true")]
    pub email_notifications: bool,

    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Create a new user with zeroed counters.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            security: None,
            verified: false,
            verification_code: None,
            reset_code: None,
            credits: 0,
            upload_count: 0,
            uploaded_notes: vec![],
            joined_channels: vec![],
            email_notifications: true,
            created_at: DateTime::now(),
        }
    }

    /// Hex form of the document id (empty for unsaved users).
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}
