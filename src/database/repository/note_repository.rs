//! Note repository.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::options::FindOptions;
use mongodb::Collection;
use tracing::debug;

use crate::database::models::Note;
use crate::database::store::{NoteStore, StoreError, StoreResult};
use crate::database::Database;

/// Repository for uploaded notes. Notes are append-only.
pub struct NoteRepository {
    collection: Collection<Note>,
}

impl NoteRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("notes"),
        }
    }
}

#[async_trait]
impl NoteStore for NoteRepository {
    async fn insert(&self, note: &Note) -> StoreResult<ObjectId> {
        let result = self.collection.insert_one(note).await?;
        let id = result.inserted_id.as_object_id().ok_or(StoreError::MissingId)?;
        debug!("Inserted note {} ({})", note.file_path, id);
        Ok(id)
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<Note>> {
        let options = FindOptions::builder().sort(doc! { "uploadedAt": -1 }).build();
        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<Note>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let options = FindOptions::builder().sort(doc! { "uploadedAt": -1 }).build();
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
