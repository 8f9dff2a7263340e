//! File storage adapter.
//!
//! Uploaded files are committed into a Git-hosting repository and served
//! back from its raw-content host.

mod github;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use github::GitHubStorage;

/// File storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The remote API reported its rate limit as exhausted.
    #[error("storage rate limit exceeded")]
    RateLimited,

    #[error("storage API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A file that was written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub public_url: String,
}

/// Basic facts about the backing repository, for health checks.
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    pub full_name: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Create or update the file at `path` with `content`.
    async fn put_file(&self, path: &str, content: Bytes, message: &str) -> Result<StoredFile, StorageError>;

    async fn repository_info(&self) -> Result<RepositoryInfo, StorageError>;
}
