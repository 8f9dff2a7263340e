//! Channel model: a group sharing a pool of notes.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Embedded membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMember {
    pub user_id: ObjectId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "DateTime::now")]
    pub joined_at: DateTime,
}

impl ChannelMember {
    pub fn new(user_id: ObjectId, username: impl Into<String>, email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            email: email.into(),
            is_admin,
            joined_at: DateTime::now(),
        }
    }
}

/// A channel (stored in `channels` collection). `code` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,

    pub code: String,

    /// Creator email.
    pub created_by: String,

    #[serde(default)]
    pub members: Vec<ChannelMember>,

    #[serde(default)]
    pub notes: Vec<ObjectId>,

    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
}

impl Channel {
    /// Create a channel whose only member is `owner`, as admin.
    pub fn new(name: impl Into<String>, code: impl Into<String>, owner: ChannelMember) -> Self {
        Self {
            id: None,
            name: name.into(),
            code: code.into(),
            created_by: owner.email.clone(),
            members: vec![owner],
            notes: vec![],
            created_at: DateTime::now(),
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_member(&self, email: &str) -> bool {
        self.members.iter().any(|m| m.email.eq_ignore_ascii_case(email))
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.is_admin && m.email.eq_ignore_ascii_case(email))
    }
}
