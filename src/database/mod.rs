//! Persistence layer: models, store traits and their MongoDB implementation.

pub mod models;
mod mongo;
mod repository;
pub mod store;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;

pub use models::*;
pub use mongo::Database;
pub use repository::{ChannelRepository, NoteRepository, UserRepository};
pub use store::{ChannelStore, JoinOutcome, NoteStore, Store, StoreError, StoreResult, UserStore};

impl Store {
    /// Stores backed by the MongoDB repositories.
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(UserRepository::new(db)),
            notes: Arc::new(NoteRepository::new(db)),
            channels: Arc::new(ChannelRepository::new(db)),
        }
    }
}
