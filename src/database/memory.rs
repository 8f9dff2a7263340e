//! In-memory store for tests.
//!
//! Mirrors the MongoDB repositories' semantics: unique email and channel
//! code, conditional member push, atomic counter updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use parking_lot::RwLock;

use super::models::{Channel, ChannelMember, Note, OneTimeCode, User};
use super::store::{
    ChannelStore, JoinOutcome, NoteStore, Store, StoreError, StoreResult, UserStore,
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<ObjectId, User>>,
    notes: RwLock<Vec<Note>>,
    channels: RwLock<HashMap<ObjectId, Channel>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bundle this store as all three collections.
    pub fn store(self: &Arc<Self>) -> Store {
        Store {
            users: self.clone(),
            notes: self.clone(),
            channels: self.clone(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    fn update_user<F>(&self, email: &str, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write();
        let user = users.values_mut().find(|u| u.email == email)?;
        f(user);
        Some(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> StoreResult<ObjectId> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let id = ObjectId::new();
        let mut stored = user.clone();
        stored.id = Some(id);
        users.insert(id, stored);
        Ok(id)
    }

    async fn save_credentials(&self, user: &User) -> StoreResult<()> {
        let id = user.id.ok_or(StoreError::MissingId)?;
        if let Some(stored) = self.users.write().get_mut(&id) {
            stored.username = user.username.clone();
            stored.password_hash = user.password_hash.clone();
            stored.security = user.security.clone();
            stored.verified = user.verified;
            stored.verification_code = user.verification_code.clone();
            stored.reset_code = user.reset_code.clone();
        }
        Ok(())
    }

    async fn set_reset_code(&self, email: &str, code: Option<OneTimeCode>) -> StoreResult<()> {
        self.update_user(email, |u| u.reset_code = code);
        Ok(())
    }

    async fn set_email_notifications(&self, email: &str, enabled: bool) -> StoreResult<Option<User>> {
        Ok(self.update_user(email, |u| u.email_notifications = enabled))
    }

    async fn record_upload(
        &self,
        email: &str,
        credits: i64,
        note_id: ObjectId,
    ) -> StoreResult<Option<User>> {
        Ok(self.update_user(email, |u| {
            u.credits += credits;
            u.upload_count += 1;
            u.uploaded_notes.push(note_id);
        }))
    }

    async fn add_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()> {
        if let Some(user) = self.users.write().get_mut(&user_id)
            && !user.joined_channels.contains(&channel_id)
        {
            user.joined_channels.push(channel_id);
        }
        Ok(())
    }

    async fn remove_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()> {
        if let Some(user) = self.users.write().get_mut(&user_id) {
            user.joined_channels.retain(|c| *c != channel_id);
        }
        Ok(())
    }

    async fn find_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .read()
            .values()
            .filter(|u| emails.contains(&u.email))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn insert(&self, note: &Note) -> StoreResult<ObjectId> {
        let id = ObjectId::new();
        let mut stored = note.clone();
        stored.id = Some(id);
        self.notes.write().push(stored);
        Ok(id)
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<Note>> {
        let mut notes = self.notes.read().clone();
        // Stable sort on the reversed insertion order breaks timestamp ties newest first.
        notes.reverse();
        notes.sort_by_key(|n| std::cmp::Reverse(n.uploaded_at.timestamp_millis()));
        Ok(notes)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Note>> {
        Ok(self
            .list_newest_first()
            .await?
            .into_iter()
            .filter(|n| n.id.is_some_and(|id| ids.contains(&id)))
            .collect())
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn insert(&self, channel: &Channel) -> StoreResult<ObjectId> {
        let mut channels = self.channels.write();
        if channels.values().any(|c| c.code == channel.code) {
            return Err(StoreError::Duplicate("code"));
        }
        let id = ObjectId::new();
        let mut stored = channel.clone();
        stored.id = Some(id);
        channels.insert(id, stored);
        Ok(id)
    }

    async fn find_by_id(&self, id: ObjectId) -> StoreResult<Option<Channel>> {
        Ok(self.channels.read().get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Channel>> {
        Ok(self.channels.read().values().find(|c| c.code == code).cloned())
    }

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Channel>> {
        let channels = self.channels.read();
        Ok(ids.iter().filter_map(|id| channels.get(id).cloned()).collect())
    }

    async fn add_member(&self, channel_id: ObjectId, member: &ChannelMember) -> StoreResult<JoinOutcome> {
        let mut channels = self.channels.write();
        let Some(channel) = channels.get_mut(&channel_id) else {
            return Ok(JoinOutcome::ChannelMissing);
        };
        if channel.members.iter().any(|m| m.email == member.email) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        channel.members.push(member.clone());
        Ok(JoinOutcome::Joined)
    }

    async fn remove_member(&self, channel_id: ObjectId, user_id: ObjectId) -> StoreResult<bool> {
        let mut channels = self.channels.write();
        let Some(channel) = channels.get_mut(&channel_id) else {
            return Ok(false);
        };
        let before = channel.members.len();
        channel.members.retain(|m| m.user_id != user_id);
        Ok(channel.members.len() != before)
    }

    async fn add_note(&self, channel_id: ObjectId, note_id: ObjectId) -> StoreResult<bool> {
        match self.channels.write().get_mut(&channel_id) {
            Some(channel) => {
                channel.notes.push(note_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let user = User::new("asha", "asha@nandhaengg.org", "hash");

        UserStore::insert(store.as_ref(), &user).await.unwrap();
        let err = UserStore::insert(store.as_ref(), &user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn memory_store_record_upload_accumulates() {
        let store = MemoryStore::new();
        let user = User::new("asha", "asha@nandhaengg.org", "hash");
        UserStore::insert(store.as_ref(), &user).await.unwrap();

        store.record_upload(&user.email, 3, ObjectId::new()).await.unwrap();
        let updated = store
            .record_upload(&user.email, 2, ObjectId::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.credits, 5);
        assert_eq!(updated.upload_count, 2);
        assert_eq!(updated.uploaded_notes.len(), 2);
    }
}
