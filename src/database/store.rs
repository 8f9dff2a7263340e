//! Store traits: the persistence seam between handlers and MongoDB.
//!
//! Each collection gets a trait so the route layer and the upload workflow
//! can run against MongoDB in production and an in-memory store in tests.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use super::models::{Channel, ChannelMember, Note, OneTimeCode, User};

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate value for unique field {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("stored document has no id")]
    MissingId,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional membership insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    ChannelMissing,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the email is taken.
    async fn insert(&self, user: &User) -> StoreResult<ObjectId>;

    /// Overwrite username, password hash, security questions, `verified` and
    /// both one-time codes of the user with `user.id`. Counters, uploaded
    /// notes and joined channels are left untouched.
    async fn save_credentials(&self, user: &User) -> StoreResult<()>;

    async fn set_reset_code(&self, email: &str, code: Option<OneTimeCode>) -> StoreResult<()>;

    async fn set_email_notifications(&self, email: &str, enabled: bool) -> StoreResult<Option<User>>;

    /// Add `credits`, bump the upload counter and append `note_id`, in one
    /// write. Returns the updated user.
    async fn record_upload(&self, email: &str, credits: i64, note_id: ObjectId)
        -> StoreResult<Option<User>>;

    async fn add_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()>;

    async fn remove_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()>;

    /// Users whose email is in `emails`.
    async fn find_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, note: &Note) -> StoreResult<ObjectId>;

    /// All notes, newest first.
    async fn list_newest_first(&self) -> StoreResult<Vec<Note>>;

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Note>>;
}

#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Insert a channel. Fails with [`StoreError::Duplicate`] if the code is taken.
    async fn insert(&self, channel: &Channel) -> StoreResult<ObjectId>;

    async fn find_by_id(&self, id: ObjectId) -> StoreResult<Option<Channel>>;

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Channel>>;

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Channel>>;

    /// Push `member` unless a member with the same email already exists.
    async fn add_member(&self, channel_id: ObjectId, member: &ChannelMember) -> StoreResult<JoinOutcome>;

    /// Pull the member with `user_id`. Returns false if nothing was removed.
    async fn remove_member(&self, channel_id: ObjectId, user_id: ObjectId) -> StoreResult<bool>;

    /// Append `note_id` to the channel note list. Returns false if the channel is gone.
    async fn add_note(&self, channel_id: ObjectId, note_id: ObjectId) -> StoreResult<bool>;
}

/// All stores, shared by handlers.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserStore>,
    pub notes: Arc<dyn NoteStore>,
    pub channels: Arc<dyn ChannelStore>,
}
