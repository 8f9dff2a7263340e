//! Notification adapter: transactional email.

mod sendgrid;
pub mod templates;

use async_trait::async_trait;
use thiserror::Error;

pub use sendgrid::SendGridMailer;

/// Email delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A single HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}
