//! The upload sequence.
//!
//! Pre-checks run before any side effect. Once the file is stored, the
//! note, uploader counters and channel list are written in that order
//! with no rollback; channel notifications are best effort.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{FileType, RateLimitGate};
use crate::database::{Channel, Note, NoteMetadata, Store, StoreError, User};
use crate::mail::{Mailer, templates};
use crate::storage::{FileStorage, StorageError};

/// Largest accepted upload, in bytes (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Channel value the frontend sends when no channel is selected.
const NO_CHANNEL: &str = "none";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    MissingFile,

    #[error("file exceeds the 10 MiB limit")]
    TooLarge,

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// `minutes` is known when the local cooldown refused the upload.
    #[error("storage rate limited")]
    RateLimited { minutes: Option<i64> },

    #[error("uploader not found")]
    UserNotFound,

    #[error("channel not found")]
    ChannelNotFound,

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The file part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub metadata: NoteMetadata,
    pub uploaded_by: String,
    pub channel: Option<String>,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub note: Note,
    pub file_type: FileType,
    pub credits_earned: i64,
    /// Uploader after counters were updated.
    pub user: User,
    /// Channel members that were emailed successfully.
    pub notified: usize,
}

/// Collision-resistant storage name: millisecond prefix plus the original
/// name with everything outside `[A-Za-z0-9.-]` replaced by `_`.
pub fn storage_name(now: DateTime<Utc>, original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{}-{}", now.timestamp_millis(), sanitized)
}

/// Runs uploads against the stores and external adapters.
#[derive(Clone)]
pub struct UploadService {
    store: Store,
    storage: Arc<dyn FileStorage>,
    mailer: Arc<dyn Mailer>,
    gate: Arc<RateLimitGate>,
}

impl UploadService {
    pub fn new(
        store: Store,
        storage: Arc<dyn FileStorage>,
        mailer: Arc<dyn Mailer>,
        gate: Arc<RateLimitGate>,
    ) -> Self {
        Self {
            store,
            storage,
            mailer,
            gate,
        }
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, UploadError> {
        let UploadRequest {
            file,
            metadata,
            uploaded_by,
            channel,
        } = request;

        // 1. File checks
        let file = file.ok_or(UploadError::MissingFile)?;
        if file.bytes.len() > MAX_FILE_SIZE {
            return Err(UploadError::TooLarge);
        }
        let file_type = FileType::from_name(&file.name);
        if !file_type.is_supported() {
            return Err(UploadError::UnsupportedType(file.name));
        }

        // 2. Cooldown, uploader and channel
        let now = Utc::now();
        self.gate
            .check(now)
            .map_err(|minutes| UploadError::RateLimited { minutes: Some(minutes) })?;

        let uploaded_by = uploaded_by.trim().to_lowercase();
        if self.store.users.find_by_email(&uploaded_by).await?.is_none() {
            return Err(UploadError::UserNotFound);
        }

        let channel = match channel.as_deref().map(str::trim) {
            None | Some("") | Some(NO_CHANNEL) => None,
            Some(raw) => {
                let id = ObjectId::parse_str(raw).map_err(|_| UploadError::ChannelNotFound)?;
                let channel = self
                    .store
                    .channels
                    .find_by_id(id)
                    .await?
                    .ok_or(UploadError::ChannelNotFound)?;
                Some(channel)
            }
        };

        // 3-4. Store the file
        let path = format!("notes/{}", storage_name(now, &file.name));
        let title = if metadata.topic.trim().is_empty() {
            file.name.as_str()
        } else {
            metadata.topic.as_str()
        };
        let message = format!("Upload note: {title}");

        info!(
            "Uploading {} ({}, {} bytes) for {}",
            path,
            file_type.as_str(),
            file.bytes.len(),
            uploaded_by
        );
        let stored = match self.storage.put_file(&path, file.bytes, &message).await {
            Ok(stored) => stored,
            Err(StorageError::RateLimited) => {
                self.gate.trip(Utc::now());
                return Err(UploadError::RateLimited { minutes: None });
            }
            Err(e) => return Err(UploadError::Storage(e)),
        };

        // 5-6. Record the note
        let credits_earned = file_type.credits();
        let mut note = Note {
            id: None,
            file_name: file.name,
            file_url: stored.public_url,
            file_path: stored.path,
            metadata,
            channel: channel.as_ref().map(Channel::id_hex),
            uploaded_by: uploaded_by.clone(),
            uploaded_at: mongodb::bson::DateTime::now(),
        };
        let note_id = self.store.notes.insert(&note).await?;
        note.id = Some(note_id);

        // 7. Reward the uploader
        let user = self
            .store
            .users
            .record_upload(&uploaded_by, credits_earned, note_id)
            .await?
            .ok_or(UploadError::UserNotFound)?;

        // 8. Share into the channel
        let mut notified = 0;
        if let Some(channel) = channel {
            let channel_id = channel.id.ok_or(StoreError::MissingId)?;
            if self.store.channels.add_note(channel_id, note_id).await? {
                info!("Note {} added to channel \"{}\"", note_id, channel.name);
                notified = self.notify_members(&channel, &note).await;
            } else {
                warn!("Channel {} vanished before note {} was linked", channel_id, note_id);
            }
        }

        info!(
            "Upload complete: {} earned {} credits ({} total), {} members notified",
            uploaded_by, credits_earned, user.credits, notified
        );

        Ok(UploadReceipt {
            note,
            file_type,
            credits_earned,
            user,
            notified,
        })
    }

    /// Email every other member who has notifications on. Failures are
    /// logged and swallowed. Returns the number of successful sends.
    async fn notify_members(&self, channel: &Channel, note: &Note) -> usize {
        let recipients: Vec<String> = channel
            .members
            .iter()
            .map(|m| m.email.to_lowercase())
            .filter(|email| *email != note.uploaded_by)
            .collect();

        let users = match self.store.users.find_by_emails(&recipients).await {
            Ok(users) => users,
            Err(e) => {
                warn!("Skipping notifications for channel {}: {}", channel.name, e);
                return 0;
            }
        };

        let emails: Vec<_> = users
            .iter()
            .filter(|u| {
                if !u.email_notifications {
                    debug!("{} opted out of channel notifications", u.email);
                }
                u.email_notifications
            })
            .map(|u| {
                templates::channel_upload(
                    &u.email,
                    &channel.name,
                    &note.uploaded_by,
                    note.title(),
                    &note.file_url,
                )
            })
            .collect();

        let results = join_all(emails.iter().map(|email| self.mailer.send(email))).await;

        let mut sent = 0;
        for (email, result) in emails.iter().zip(results) {
            match result {
                Ok(()) => sent += 1,
                Err(e) => warn!("Channel notification to {} failed: {}", email.to, e),
            }
        }
        sent
    }
}
