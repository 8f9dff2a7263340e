//! Channel repository.
//!
//! Membership changes are single conditional updates on the channel
//! document, so a concurrent double join can only push one member.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::{Channel, ChannelMember};
use crate::database::mongo::is_duplicate_key;
use crate::database::store::{ChannelStore, JoinOutcome, StoreError, StoreResult};
use crate::database::Database;

/// Repository for channels.
pub struct ChannelRepository {
    collection: Collection<Channel>,
}

impl ChannelRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("channels"),
        }
    }
}

#[async_trait]
impl ChannelStore for ChannelRepository {
    async fn insert(&self, channel: &Channel) -> StoreResult<ObjectId> {
        let result = self.collection.insert_one(channel).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate("code")
            } else {
                StoreError::Mongo(e)
            }
        })?;

        let id = result.inserted_id.as_object_id().ok_or(StoreError::MissingId)?;
        debug!("Inserted channel {} with code {}", id, channel.code);
        Ok(id)
    }

    async fn find_by_id(&self, id: ObjectId) -> StoreResult<Option<Channel>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Channel>> {
        Ok(self.collection.find_one(doc! { "code": code }).await?)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Channel>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self.collection.find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_member(&self, channel_id: ObjectId, member: &ChannelMember) -> StoreResult<JoinOutcome> {
        let filter = doc! {
            "_id": channel_id,
            "members.email": { "$ne": member.email.as_str() },
        };
        let update = doc! {
            "$push": {
                "members": {
                    "userId": member.user_id,
                    "username": member.username.as_str(),
                    "email": member.email.as_str(),
                    "isAdmin": member.is_admin,
                    "joinedAt": member.joined_at,
                }
            }
        };

        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count > 0 {
            debug!("{} joined channel {}", member.email, channel_id);
            return Ok(JoinOutcome::Joined);
        }

        // Nothing matched: either the channel is gone or the email is already in it.
        let exists = self.collection.find_one(doc! { "_id": channel_id }).await?.is_some();
        Ok(if exists {
            JoinOutcome::AlreadyMember
        } else {
            JoinOutcome::ChannelMissing
        })
    }

    async fn remove_member(&self, channel_id: ObjectId, user_id: ObjectId) -> StoreResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": channel_id },
                doc! { "$pull": { "members": { "userId": user_id } } },
            )
            .await?;

        debug!("Removed user {} from channel {}: {}", user_id, channel_id, result.modified_count > 0);
        Ok(result.modified_count > 0)
    }

    async fn add_note(&self, channel_id: ObjectId, note_id: ObjectId) -> StoreResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": channel_id },
                doc! { "$push": { "notes": note_id } },
            )
            .await?;

        Ok(result.matched_count > 0)
    }
}
