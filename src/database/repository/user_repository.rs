//! User repository with an email-keyed lookup cache.
//!
//! Login, profile and upload all resolve users by email, so the cache is
//! keyed on the lower-cased address. Every write refreshes or drops the
//! entry before returning.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Collection;
use tracing::debug;

use crate::cache::{CacheConfig, TypedCache};
use crate::database::models::{OneTimeCode, User};
use crate::database::mongo::is_duplicate_key;
use crate::database::store::{StoreError, StoreResult, UserStore};
use crate::database::Database;

/// Repository for user accounts.
pub struct UserRepository {
    collection: Collection<User>,
    by_email: TypedCache<String, User>,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
            by_email: TypedCache::new("users_by_email", CacheConfig::lookup()),
        }
    }

    /// Apply `update` to the user matching `filter` and refresh the cache
    /// with the post-update document.
    async fn update_and_refresh(&self, filter: Document, update: Document) -> StoreResult<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?;

        if let Some(user) = &updated {
            self.by_email.refresh(user.email.clone(), user.clone());
        }

        Ok(updated)
    }

    async fn set_code(&self, email: &str, field: &str, code: Option<OneTimeCode>) -> StoreResult<()> {
        let update = match code {
            Some(code) => doc! { "$set": { field: code_document(&code) } },
            None => doc! { "$unset": { field: "" } },
        };

        self.update_and_refresh(doc! { "email": email }, update).await?;
        debug!("Updated {} for {}", field, email);
        Ok(())
    }
}

fn code_document(code: &OneTimeCode) -> Document {
    doc! { "code": code.code.as_str(), "expiresAt": code.expires_at }
}

/// `$set`/`$unset` update for the credential fields of `user`.
fn credentials_update(user: &User) -> Document {
    let mut set = doc! {
        "username": user.username.as_str(),
        "passwordHash": user.password_hash.as_str(),
        "verified": user.verified,
    };
    let mut unset = Document::new();

    match &user.security {
        Some(security) => {
            set.insert("securityQuestion1", security.security_question1.as_str());
            set.insert("securityAnswer1Hash", security.security_answer1_hash.as_str());
            set.insert("securityQuestion2", security.security_question2.as_str());
            set.insert("securityAnswer2Hash", security.security_answer2_hash.as_str());
        }
        None => {
            for field in [
                "securityQuestion1",
                "securityAnswer1Hash",
                "securityQuestion2",
                "securityAnswer2Hash",
            ] {
                unset.insert(field, "");
            }
        }
    }

    for (field, code) in [
        ("verificationCode", &user.verification_code),
        ("resetCode", &user.reset_code),
    ] {
        match code {
            Some(code) => {
                set.insert(field, code_document(code));
            }
            None => {
                unset.insert(field, "");
            }
        }
    }

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        if let Some(user) = self.by_email.get(&email.to_string()) {
            return Ok(Some(user));
        }

        let seen = self.by_email.generation();
        let result = self.collection.find_one(doc! { "email": email }).await?;
        debug!("DB get user {}: {:?}", email, result.is_some());

        if let Some(user) = &result {
            self.by_email.fill(user.email.clone(), user.clone(), seen);
        }

        Ok(result)
    }

    async fn insert(&self, user: &User) -> StoreResult<ObjectId> {
        let result = self.collection.insert_one(user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate("email")
            } else {
                StoreError::Mongo(e)
            }
        })?;

        let id = result.inserted_id.as_object_id().ok_or(StoreError::MissingId)?;
        self.by_email.invalidate(&user.email);
        debug!("Inserted user {} ({})", user.email, id);
        Ok(id)
    }

    async fn save_credentials(&self, user: &User) -> StoreResult<()> {
        let id = user.id.ok_or(StoreError::MissingId)?;
        self.update_and_refresh(doc! { "_id": id }, credentials_update(user))
            .await?;
        debug!("Saved credentials for {}", user.email);
        Ok(())
    }

    async fn set_reset_code(&self, email: &str, code: Option<OneTimeCode>) -> StoreResult<()> {
        self.set_code(email, "resetCode", code).await
    }

    async fn set_email_notifications(&self, email: &str, enabled: bool) -> StoreResult<Option<User>> {
        self.update_and_refresh(
            doc! { "email": email },
            doc! { "$set": { "emailNotifications": enabled } },
        )
        .await
    }

    async fn record_upload(
        &self,
        email: &str,
        credits: i64,
        note_id: ObjectId,
    ) -> StoreResult<Option<User>> {
        self.update_and_refresh(
            doc! { "email": email },
            doc! {
                "$inc": { "credits": credits, "uploadCount": 1_i64 },
                "$push": { "uploadedNotes": note_id },
            },
        )
        .await
    }

    async fn add_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()> {
        self.update_and_refresh(
            doc! { "_id": user_id },
            doc! { "$addToSet": { "joinedChannels": channel_id } },
        )
        .await?;
        Ok(())
    }

    async fn remove_channel(&self, user_id: ObjectId, channel_id: ObjectId) -> StoreResult<()> {
        self.update_and_refresh(
            doc! { "_id": user_id },
            doc! { "$pull": { "joinedChannels": channel_id } },
        )
        .await?;
        Ok(())
    }

    async fn find_by_emails(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        if emails.is_empty() {
            return Ok(vec![]);
        }

        let cursor = self
            .collection
            .find(doc! { "email": { "$in": emails.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_update_leaves_counters_alone() {
        let mut user = User::new("asha", "asha@nandhaengg.org", "$argon2id$hash");
        user.credits = 9;
        user.upload_count = 3;
        user.reset_code = Some(OneTimeCode::issue("123456"));

        let update = credentials_update(&user);
        let set = update.get_document("$set").unwrap();
        let unset = update.get_document("$unset").unwrap();

        assert_eq!(set.get_str("passwordHash").unwrap(), "$argon2id$hash");
        assert_eq!(set.get_document("resetCode").unwrap().get_str("code").unwrap(), "123456");
        for counter in ["credits", "uploadCount", "uploadedNotes", "joinedChannels"] {
            assert!(!set.contains_key(counter));
            assert!(!unset.contains_key(counter));
        }
        assert!(unset.contains_key("verificationCode"));
        assert!(unset.contains_key("securityAnswer1Hash"));
    }
}
