//! Configuration module for the Nandha Notes backend.
//!
//! Loads configuration from environment variables (and `.env`).

use std::env;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 5000;

/// GitHub contents API settings for file storage.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// SendGrid settings for outgoing email.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    pub github: GitHubConfig,
    pub mail: MailConfig,

    /// Only addresses on this domain may sign up or reset a password.
    pub allowed_email_domain: String,

    /// New accounts must confirm an emailed code before logging in.
    pub require_email_verification: bool,

    /// Recipient for `/test-email`.
    pub test_email_recipient: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error naming the first required variable that is unset,
    /// or a variable that fails to parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = match optional("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let require_email_verification = match optional("REQUIRE_EMAIL_VERIFICATION") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("REQUIRE_EMAIL_VERIFICATION must be a boolean, got {raw:?}"))?,
            None => true,
        };

        let allowed_email_domain = optional("ALLOWED_EMAIL_DOMAIN")
            .map(|d| d.trim_start_matches('@').to_lowercase())
            .unwrap_or_else(|| "nandhaengg.org".to_string());

        Ok(Self {
            port,
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: optional("MONGODB_DATABASE")
                .unwrap_or_else(|| "nandha_notes".to_string()),
            github: GitHubConfig {
                api_url: optional("GITHUB_API_URL")
                    .unwrap_or_else(|| "https://api.github.com".to_string()),
                token: required("GITHUB_TOKEN")?,
                owner: required("GITHUB_OWNER")?,
                repo: required("GITHUB_REPO")?,
                branch: optional("GITHUB_BRANCH").unwrap_or_else(|| "main".to_string()),
            },
            mail: MailConfig {
                api_url: optional("SENDGRID_API_URL")
                    .unwrap_or_else(|| "https://api.sendgrid.com".to_string()),
                api_key: required("SENDGRID_API_KEY")?,
                from: optional("MAIL_FROM")
                    .unwrap_or_else(|| "nandhanotes.official@gmail.com".to_string()),
            },
            allowed_email_domain,
            require_email_verification,
            test_email_recipient: optional("TEST_EMAIL_RECIPIENT"),
        })
    }
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} must be set"))
}

/// Read a variable, treating an empty value as unset.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
