//! Nandha Notes - note sharing backend
//!
//! Students upload study material, earn credits and share notes into
//! invite-code channels.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models, store traits and repositories
//! - `cache` - TTL caching with Moka
//! - `auth` - Password hashing, one-time codes and signup policy
//! - `storage` - Git-hosted file storage
//! - `mail` - Transactional email
//! - `upload` - The upload workflow and storage cooldown
//! - `api` - HTTP routes

mod api;
mod auth;
mod cache;
mod config;
mod database;
mod mail;
mod storage;
mod upload;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, Settings};
use config::Config;
use database::{Database, Store};
use mail::SendGridMailer;
use storage::GitHubStorage;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" for our crate and request traces
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nandha_notes=info,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Nandha Notes backend...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!(
        "Storage repo: {}/{} ({})",
        config.github.owner, config.github.repo, config.github.branch
    );
    if !config.require_email_verification {
        info!("Email verification is disabled");
    }

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;

    let state = AppState::new(
        Store::mongo(&db),
        Arc::new(GitHubStorage::new(config.github.clone())),
        Arc::new(SendGridMailer::new(config.mail.clone())),
        Settings {
            allowed_email_domain: config.allowed_email_domain.clone(),
            require_email_verification: config.require_email_verification,
            test_email_recipient: config.test_email_recipient.clone(),
        },
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running on port {}", config.port);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
