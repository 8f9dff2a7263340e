//! GitHub contents API client.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FileStorage, RepositoryInfo, StorageError, StoredFile};
use crate::config::GitHubConfig;

const USER_AGENT: &str = "nandha-notes";

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

#[derive(Deserialize)]
struct RepoResponse {
    full_name: String,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Stores files as commits in one GitHub repository branch.
pub struct GitHubStorage {
    client: Client,
    config: GitHubConfig,
}

impl GitHubStorage {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Raw-content URL for `path` on the configured branch.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.config.owner, self.config.repo, self.config.branch, path
        )
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
    }

    /// Turn a non-success response into a [`StorageError`].
    async fn error_from(response: Response) -> StorageError {
        let status = response.status();
        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body: ApiErrorBody = response.json().await.unwrap_or_default();

        if is_rate_limited(status, remaining.as_deref(), &body.message) {
            warn!("GitHub rate limit hit: {}", body.message);
            return StorageError::RateLimited;
        }

        StorageError::Api {
            status: status.as_u16(),
            message: body.message,
        }
    }
}

/// GitHub signals exhaustion with 403 or 429, a zero remaining-quota
/// header, or a message mentioning the rate limit.
fn is_rate_limited(status: StatusCode, remaining: Option<&str>, message: &str) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    status == StatusCode::TOO_MANY_REQUESTS
        || remaining == Some("0")
        || message.to_lowercase().contains("rate limit")
}

#[async_trait]
impl FileStorage for GitHubStorage {
    async fn put_file(&self, path: &str, content: Bytes, message: &str) -> Result<StoredFile, StorageError> {
        let body = PutContentRequest {
            message,
            content: STANDARD.encode(&content),
            branch: &self.config.branch,
        };

        let url = format!("{}/contents/{}", self.repo_url(), path);
        let response = self.authorized(self.client.put(&url)).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        debug!("Committed {} ({} bytes)", path, content.len());
        Ok(StoredFile {
            path: path.to_string(),
            public_url: self.public_url(path),
        })
    }

    async fn repository_info(&self) -> Result<RepositoryInfo, StorageError> {
        let response = self.authorized(self.client.get(self.repo_url())).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let repo: RepoResponse = response.json().await?;
        Ok(RepositoryInfo {
            full_name: repo.full_name,
        })
    }
}
