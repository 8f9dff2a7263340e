//! HTTP routes.
//!
//! Handlers are thin: they parse the request, call the stores or the
//! upload service and shape the JSON response. Every failure goes through
//! [`ApiError`] so clients always get a `{"message": ...}` body.

mod accounts;
mod channels;
mod error;
mod extract;
mod health;
mod notes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::database::Store;
use crate::mail::Mailer;
use crate::storage::FileStorage;
use crate::upload::{MAX_FILE_SIZE, RateLimitGate, UploadService};

pub use error::ApiError;

/// Request body ceiling. Leaves room for the multipart framing and text
/// fields around a maximum-size file.
const BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

/// Account policy knobs the handlers need from the configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub allowed_email_domain: String,
    pub require_email_verification: bool,
    pub test_email_recipient: Option<String>,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub storage: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub uploads: UploadService,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Store,
        storage: Arc<dyn FileStorage>,
        mailer: Arc<dyn Mailer>,
        settings: Settings,
    ) -> Self {
        let gate = Arc::new(RateLimitGate::new());
        let uploads = UploadService::new(store.clone(), storage.clone(), mailer.clone(), gate);
        Self {
            store,
            storage,
            mailer,
            uploads,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/check-email", post(accounts::check_email))
        .route("/signup", post(accounts::signup))
        .route("/verify", post(accounts::verify))
        .route("/login", post(accounts::login))
        .route("/get-security-questions", post(accounts::security_questions))
        .route("/verify-security-answers", post(accounts::verify_security_answers))
        .route("/request-reset", post(accounts::request_reset))
        .route("/verify-reset", post(accounts::verify_reset))
        .route("/update-password", post(accounts::update_password))
        .route("/notification-settings", post(accounts::notification_settings))
        .route("/user/{email}", get(accounts::profile))
        // Channels
        .route("/create-channel", post(channels::create_channel))
        .route("/join-channel", post(channels::join_channel))
        .route("/user-channels/{email}", get(channels::user_channels))
        .route("/channel/{channel_id}", get(channels::channel_details))
        .route("/remove-user-from-channel", post(channels::remove_member))
        // Notes
        .route("/upload-note", post(notes::upload_note))
        .route("/get-notes", get(notes::list_notes))
        // Diagnostics
        .route("/test-github", get(health::test_github))
        .route("/test-email", get(health::test_email))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lowercased, trimmed email as stored.
fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
