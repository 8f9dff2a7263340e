//! Recording doubles for the external adapters.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::mail::{Email, MailError, Mailer};
use crate::storage::{FileStorage, RepositoryInfo, StorageError, StoredFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextFailure {
    None,
    RateLimit,
    Api,
}

struct StorageState {
    calls: usize,
    messages: Vec<String>,
    next_failure: NextFailure,
}

/// In-memory [`FileStorage`] that counts calls and can be told to fail once.
pub struct RecordingStorage {
    state: Mutex<StorageState>,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StorageState {
                calls: 0,
                messages: vec![],
                next_failure: NextFailure::None,
            }),
        })
    }

    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn last_message(&self) -> Option<String> {
        self.state.lock().messages.last().cloned()
    }

    pub fn rate_limit_next(&self) {
        self.state.lock().next_failure = NextFailure::RateLimit;
    }

    pub fn fail_next(&self) {
        self.state.lock().next_failure = NextFailure::Api;
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("https://files.test/{path}")
    }
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn put_file(&self, path: &str, _content: Bytes, message: &str) -> Result<StoredFile, StorageError> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.messages.push(message.to_string());

        match std::mem::replace(&mut state.next_failure, NextFailure::None) {
            NextFailure::RateLimit => Err(StorageError::RateLimited),
            NextFailure::Api => Err(StorageError::Api {
                status: 422,
                message: "Invalid request".to_string(),
            }),
            NextFailure::None => Ok(StoredFile {
                path: path.to_string(),
                public_url: self.url_for(path),
            }),
        }
    }

    async fn repository_info(&self) -> Result<RepositoryInfo, StorageError> {
        Ok(RepositoryInfo {
            full_name: "nandha/notes-store".to_string(),
        })
    }
}

#[derive(Default)]
struct MailState {
    attempts: usize,
    sent: Vec<Email>,
    fail_all: bool,
}

/// [`Mailer`] that keeps every delivered message.
#[derive(Default)]
pub struct RecordingMailer {
    state: Mutex<MailState>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_all(&self) {
        self.state.lock().fail_all = true;
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Recipients of delivered messages, in send order.
    pub fn recipients(&self) -> Vec<String> {
        self.state.lock().sent.iter().map(|e| e.to.clone()).collect()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.state.lock().sent.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if state.fail_all {
            return Err(MailError::Rejected {
                status: 401,
                body: "invalid api key".to_string(),
            });
        }
        state.sent.push(email.clone());
        Ok(())
    }
}
