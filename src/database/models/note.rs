//! Uploaded note model.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Free-text descriptive fields supplied with an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMetadata {
    #[serde(default)]
    pub regulation: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub description: String,
}

/// A stored study material (stored in `notes` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Name of the file as uploaded.
    pub file_name: String,

    /// Public retrieval URL.
    pub file_url: String,

    /// Path inside the storage repository.
    pub file_path: String,

    #[serde(flatten)]
    pub metadata: NoteMetadata,

    /// Channel id the note was shared into, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Uploader email.
    pub uploaded_by: String,

    #[serde(default = "DateTime::now")]
    pub uploaded_at: DateTime,
}

impl Note {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Display title: topic, falling back to the file name.
    pub fn title(&self) -> &str {
        if self.metadata.topic.trim().is_empty() {
            &self.file_name
        } else {
            &self.metadata.topic
        }
    }
}
