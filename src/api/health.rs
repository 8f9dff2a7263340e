//! Connectivity checks for the storage and mail adapters.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::mail::templates;

pub async fn test_github(State(state): State<AppState>) -> Response {
    match state.storage.repository_info().await {
        Ok(repo) => {
            info!("Storage check passed for {}", repo.full_name);
            Json(json!({
                "success": true,
                "message": "GitHub connection working",
                "repository": repo.full_name,
            }))
            .into_response()
        }
        Err(e) => {
            warn!("Storage check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "GitHub connection failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn test_email(State(state): State<AppState>) -> Response {
    let Some(recipient) = state.settings.test_email_recipient.as_deref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "TEST_EMAIL_RECIPIENT is not configured",
            })),
        )
            .into_response();
    };

    match state.mailer.send(&templates::connectivity_test(recipient)).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": format!("Test email sent to {recipient}"),
        }))
        .into_response(),
        Err(e) => {
            warn!("Email check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Email sending failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::TestApp;

    #[tokio::test]
    async fn github_check_reports_repository() {
        let app = TestApp::new(false);
        let (status, body) = app.get("/test-github").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["repository"], "nandha/notes-store");
    }

    #[tokio::test]
    async fn email_check_uses_configured_recipient() {
        let app = TestApp::new(false);
        let (status, body) = app.get("/test-email").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.mailer.recipients(), vec!["admin@nandhaengg.org".to_string()]);
        assert_eq!(body["success"], true);

        app.mailer.fail_all();
        let (status, body) = app.get("/test-email").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }
}
