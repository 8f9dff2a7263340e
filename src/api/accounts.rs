//! Signup, verification, login and password recovery.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ApiError;
use super::extract::ApiJson;
use super::{AppState, normalize_email};
use crate::auth::{
    generate_code, hash_secret, is_allowed_email, normalize_answer, password_problems,
    verify_secret,
};
use crate::database::{OneTimeCode, SecurityQuestions, StoreError, User};
use crate::mail::templates;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(super) fn json(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Public view of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub credits: i64,
    pub upload_count: i64,
    pub verified: bool,
    pub email_notifications: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            credits: user.credits,
            upload_count: user.upload_count,
            verified: user.verified,
            email_notifications: user.email_notifications,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: UserView,
}

async fn find_user(state: &AppState, email: &str, missing: &str) -> Result<User, ApiError> {
    state
        .store
        .users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| ApiError::not_found(missing))
}

fn check_password(password: &str) -> Result<(), ApiError> {
    let problems = password_problems(password);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Password must contain {}",
            problems.join(", ")
        )))
    }
}

fn hash(secret: &str) -> Result<String, ApiError> {
    hash_secret(secret).map_err(|e| ApiError::internal("Failed to hash credentials.", e))
}

fn answers_match(security: &SecurityQuestions, answer1: &str, answer2: &str) -> bool {
    verify_secret(&normalize_answer(answer1), &security.security_answer1_hash)
        && verify_secret(&normalize_answer(answer2), &security.security_answer2_hash)
}

#[derive(Debug, Deserialize)]
pub struct CheckEmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckEmailResponse {
    pub exists: bool,
}

pub async fn check_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CheckEmailRequest>,
) -> Result<Json<CheckEmailResponse>, ApiError> {
    let exists = state
        .store
        .users
        .find_by_email(&normalize_email(&req.email))
        .await?
        .is_some();
    Ok(Json(CheckEmailResponse { exists }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub security_question1: Option<String>,
    pub security_answer1: Option<String>,
    pub security_question2: Option<String>,
    pub security_answer2: Option<String>,
}

impl SignupRequest {
    /// Security questions are optional, but when any part is given all four must be.
    fn security(&self) -> Result<Option<SecurityQuestions>, ApiError> {
        let parts = [
            &self.security_question1,
            &self.security_answer1,
            &self.security_question2,
            &self.security_answer2,
        ]
        .map(|part| part.as_deref().map(str::trim).filter(|p| !p.is_empty()));

        match parts {
            [None, None, None, None] => Ok(None),
            [Some(q1), Some(a1), Some(q2), Some(a2)] => Ok(Some(SecurityQuestions {
                security_question1: q1.to_string(),
                security_answer1_hash: hash(&normalize_answer(a1))?,
                security_question2: q2.to_string(),
                security_answer2_hash: hash(&normalize_answer(a2))?,
            })),
            _ => Err(ApiError::bad_request(
                "Both security questions and answers are required",
            )),
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let username = req.username.trim();
    let email = normalize_email(&req.email);
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Please fill in all fields"));
    }

    let domain = &state.settings.allowed_email_domain;
    if !is_allowed_email(&email, domain) {
        return Err(ApiError::bad_request(format!(
            "Please use your domain mail (@{domain})"
        )));
    }
    check_password(&req.password)?;

    let existing = state.store.users.find_by_email(&email).await?;
    if existing.as_ref().is_some_and(|u| u.verified) {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash(&req.password)?;
    let security = req.security()?;

    // An unverified signup may be repeated. It resets the credentials of the
    // pending account and keeps whatever it already earned or joined.
    let pending = existing.is_some();
    let mut user = existing.unwrap_or_else(|| User::new(username, &email, ""));
    user.username = username.to_string();
    user.password_hash = password_hash;
    user.security = security;

    let require_verification = state.settings.require_email_verification;
    let code = generate_code();
    if require_verification {
        user.verification_code = Some(OneTimeCode::issue(&code));
    } else {
        user.verified = true;
        user.verification_code = None;
    }

    if pending {
        state.store.users.save_credentials(&user).await?;
    } else {
        match state.store.users.insert(&user).await {
            Ok(id) => user.id = Some(id),
            Err(StoreError::Duplicate(_)) => {
                return Err(ApiError::bad_request("Email already registered"));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let message = if require_verification {
        state
            .mailer
            .send(&templates::verification(&email, username, &code))
            .await
            .map_err(|e| ApiError::internal("Failed to send verification email", e))?;
        "Verification code sent to your email."
    } else {
        "Account created successfully!"
    };

    info!("New signup: {}", email);
    Ok(Json(UserResponse {
        message: message.to_string(),
        user: UserView::from(&user),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

pub async fn verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = find_user(&state, &req.email, "User not found").await?;
    if user.verified {
        return Ok(MessageResponse::json("Account already verified"));
    }

    if !user
        .verification_code
        .as_ref()
        .is_some_and(|code| code.accepts(&req.code))
    {
        return Err(ApiError::bad_request("Invalid or expired verification code"));
    }

    user.verified = true;
    user.verification_code = None;
    state.store.users.save_credentials(&user).await?;

    info!("Verified account {}", user.email);
    Ok(MessageResponse::json("Account verified successfully!"))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = find_user(&state, &req.email, "No account found. Please sign up first.").await?;

    if !verify_secret(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Incorrect password.".to_string()));
    }
    if !user.verified {
        return Err(ApiError::Forbidden(
            "Please verify your email before logging in.".to_string(),
        ));
    }

    Ok(Json(UserResponse {
        message: "Login successful!".to_string(),
        user: UserView::from(&user),
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let user = find_user(&state, &email, "User not found").await?;
    Ok(Json(UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct NotificationSettingsRequest {
    #[serde(default)]
    pub email: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsResponse {
    pub message: String,
    pub email_notifications: bool,
}

pub async fn notification_settings(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NotificationSettingsRequest>,
) -> Result<Json<NotificationSettingsResponse>, ApiError> {
    let user = state
        .store
        .users
        .set_email_notifications(&normalize_email(&req.email), req.enabled)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(NotificationSettingsResponse {
        message: "Notification settings updated".to_string(),
        email_notifications: user.email_notifications,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityQuestionsResponse {
    pub security_question1: String,
    pub security_question2: String,
}

pub async fn security_questions(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Json<SecurityQuestionsResponse>, ApiError> {
    let user = find_user(&state, &req.email, "No account found with that email.").await?;
    let security = user
        .security
        .ok_or_else(|| ApiError::bad_request("No security questions set for this account."))?;

    Ok(Json(SecurityQuestionsResponse {
        security_question1: security.security_question1,
        security_question2: security.security_question2,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityAnswersRequest {
    pub email: String,
    pub security_answer1: String,
    pub security_answer2: String,
}

pub async fn verify_security_answers(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SecurityAnswersRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = find_user(&state, &req.email, "User not found").await?;
    let matched = user
        .security
        .as_ref()
        .is_some_and(|s| answers_match(s, &req.security_answer1, &req.security_answer2));

    if !matched {
        return Err(ApiError::bad_request("Incorrect security answers"));
    }
    Ok(MessageResponse::json("Security answers verified successfully"))
}

pub async fn request_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email);
    let domain = &state.settings.allowed_email_domain;
    if !is_allowed_email(&email, domain) {
        return Err(ApiError::bad_request(format!(
            "Please use your domain mail (@{domain})"
        )));
    }

    let user = find_user(&state, &email, "No account found with that email.").await?;

    let code = generate_code();
    state
        .store
        .users
        .set_reset_code(&user.email, Some(OneTimeCode::issue(&code)))
        .await?;
    state
        .mailer
        .send(&templates::password_reset(&user.email, &code))
        .await
        .map_err(|e| ApiError::internal("Failed to send reset code", e))?;

    info!("Password reset code sent to {}", user.email);
    Ok(MessageResponse::json("Reset code sent to your email."))
}

pub async fn verify_reset(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = find_user(&state, &req.email, "User not found").await?;
    if !user.reset_code.as_ref().is_some_and(|c| c.accepts(&req.code)) {
        return Err(ApiError::bad_request("Invalid or expired reset code"));
    }
    Ok(MessageResponse::json("Code verified successfully"))
}

/// A new password plus one proof of recovery: a live reset code or both
/// security answers.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub new_password: String,
    pub code: Option<String>,
    pub security_answer1: Option<String>,
    pub security_answer2: Option<String>,
}

pub async fn update_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut user = find_user(&state, &req.email, "User not found").await?;
    check_password(&req.new_password)?;

    let by_code = match (&req.code, &user.reset_code) {
        (Some(candidate), Some(code)) => code.accepts(candidate),
        _ => false,
    };
    let by_answers = match (&req.security_answer1, &req.security_answer2, &user.security) {
        (Some(a1), Some(a2), Some(security)) => answers_match(security, a1, a2),
        _ => false,
    };
    if !by_code && !by_answers {
        return Err(ApiError::bad_request(
            "A valid reset code or correct security answers are required",
        ));
    }

    user.password_hash = hash(&req.new_password)?;
    user.reset_code = None;
    state.store.users.save_credentials(&user).await?;

    info!("Password updated for {}", user.email);
    Ok(MessageResponse::json("Password updated successfully!"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{PASSWORD, TestApp};
    use crate::database::OneTimeCode;

    const EMAIL: &str = "21cs001@nandhaengg.org";

    fn signup_body() -> serde_json::Value {
        json!({
            "username": "Asha",
            "email": "21CS001@NandhaEngg.org",
            "password": PASSWORD,
            "securityQuestion1": "First school?",
            "securityAnswer1": "St. Marys",
            "securityQuestion2": "Pet name?",
            "securityAnswer2": "Bruno",
        })
    }

    fn last_code(app: &TestApp) -> String {
        let html = app.mailer.sent().last().unwrap().html.clone();
        html.split('>')
            .filter_map(|node| node.split('<').next())
            .map(str::trim)
            .find(|text| text.len() == 6 && text.chars().all(|c| c.is_ascii_digit()))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn signup_verify_login_flow() {
        let app = TestApp::new(true);

        let (status, body) = app.post("/signup", signup_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], EMAIL);
        assert_eq!(app.mailer.recipients(), vec![EMAIL.to_string()]);

        let login = json!({ "email": EMAIL, "password": PASSWORD });
        let (status, _) = app.post("/login", login.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.post("/verify", json!({ "email": EMAIL, "code": "000000x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let code = last_code(&app);
        let (status, _) = app.post("/verify", json!({ "email": EMAIL, "code": code })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.post("/login", login).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["credits"], 0);
        assert_eq!(body["user"]["uploadCount"], 0);

        let (status, body) = app
            .post("/login", json!({ "email": EMAIL, "password": "Wrong!pass1" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect password.");
    }

    #[tokio::test]
    async fn repeated_pending_signup_keeps_earned_credits_and_channels() {
        let app = TestApp::new(true);
        let (status, _) = app.post("/signup", signup_body()).await;
        assert_eq!(status, StatusCode::OK);

        let users = app.memory.store().users;
        let pending = users.find_by_email(EMAIL).await.unwrap().unwrap();
        let channel_id = mongodb::bson::oid::ObjectId::new();
        users
            .record_upload(EMAIL, 3, mongodb::bson::oid::ObjectId::new())
            .await
            .unwrap();
        users.add_channel(pending.id.unwrap(), channel_id).await.unwrap();

        let mut again = signup_body();
        again["password"] = json!("An0ther!pass");
        let (status, body) = app.post("/signup", again).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["credits"], 3);

        let user = users.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(user.id, pending.id);
        assert_eq!(user.credits, 3);
        assert_eq!(user.upload_count, 1);
        assert_eq!(user.uploaded_notes.len(), 1);
        assert_eq!(user.joined_channels, vec![channel_id]);
        assert!(!user.verified);

        let code = last_code(&app);
        let (status, _) = app.post("/verify", json!({ "email": EMAIL, "code": code })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .post("/login", json!({ "email": EMAIL, "password": "An0ther!pass" }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_without_verification_is_immediately_usable() {
        let app = TestApp::new(false);
        let (status, body) = app.post("/signup", signup_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["verified"], true);
        assert!(app.mailer.sent().is_empty());

        let (status, _) = app.post("/login", json!({ "email": EMAIL, "password": PASSWORD })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.post("/signup", signup_body()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already registered");
    }

    #[tokio::test]
    async fn signup_enforces_domain_and_password_policy() {
        let app = TestApp::new(false);

        let mut body = signup_body();
        body["email"] = json!("asha@gmail.com");
        let (status, resp) = app.post("/signup", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "Please use your domain mail (@nandhaengg.org)");

        let mut body = signup_body();
        body["password"] = json!("weakpass");
        let (status, resp) = app.post("/signup", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["message"].as_str().unwrap().contains("one uppercase letter"));

        let mut body = signup_body();
        body["securityAnswer2"] = json!("  ");
        let (status, _) = app.post("/signup", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.post("/signup", json!({ "email": EMAIL })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.post("/check-email", json!({ "email": EMAIL })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], false);
    }

    #[tokio::test]
    async fn malformed_json_gets_message_body() {
        let app = TestApp::new(false);
        let request = axum::http::Request::post("/login")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn reset_by_emailed_code() {
        let app = TestApp::new(false);
        app.user(EMAIL).await;

        let (status, _) = app.post("/request-reset", json!({ "email": EMAIL })).await;
        assert_eq!(status, StatusCode::OK);
        let code = last_code(&app);

        let (status, _) = app.post("/verify-reset", json!({ "email": EMAIL, "code": code })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .post("/update-password", json!({ "email": EMAIL, "newPassword": "N3w!password" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .post(
                "/update-password",
                json!({ "email": EMAIL, "newPassword": "N3w!password", "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .post("/login", json!({ "email": EMAIL, "password": "N3w!password" }))
            .await;
        assert_eq!(status, StatusCode::OK);

        // The code is single use.
        let (status, _) = app.post("/verify-reset", json!({ "email": EMAIL, "code": code })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn expired_reset_code_is_rejected() {
        let app = TestApp::new(false);
        app.user(EMAIL).await;
        let expired = OneTimeCode {
            code: "123456".to_string(),
            expires_at: mongodb::bson::DateTime::from_millis(0),
        };
        app.memory
            .store()
            .users
            .set_reset_code(EMAIL, Some(expired))
            .await
            .unwrap();

        let (status, body) = app
            .post("/verify-reset", json!({ "email": EMAIL, "code": "123456" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired reset code");
    }

    #[tokio::test]
    async fn reset_by_security_answers() {
        let app = TestApp::new(false);
        app.post("/signup", signup_body()).await;

        let (status, body) = app.post("/get-security-questions", json!({ "email": EMAIL })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["securityQuestion1"], "First school?");
        assert_eq!(body["securityQuestion2"], "Pet name?");

        let answers = json!({
            "email": EMAIL,
            "securityAnswer1": "  st. marys ",
            "securityAnswer2": "BRUNO",
        });
        let (status, _) = app.post("/verify-security-answers", answers).await;
        assert_eq!(status, StatusCode::OK);

        let wrong = json!({ "email": EMAIL, "securityAnswer1": "x", "securityAnswer2": "Bruno" });
        let (status, _) = app.post("/verify-security-answers", wrong).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .post(
                "/update-password",
                json!({
                    "email": EMAIL,
                    "newPassword": "N3w!password",
                    "securityAnswer1": "St. Marys",
                    "securityAnswer2": "Bruno",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_accounts_are_not_found() {
        let app = TestApp::new(false);
        let ghost = "ghost@nandhaengg.org";

        let (status, _) = app.post("/login", json!({ "email": ghost, "password": PASSWORD })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.post("/get-security-questions", json!({ "email": ghost })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.post("/request-reset", json!({ "email": ghost })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.get(&format!("/user/{ghost}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn notification_settings_toggle() {
        let app = TestApp::new(false);
        app.user(EMAIL).await;

        let (status, body) = app
            .post("/notification-settings", json!({ "email": EMAIL, "enabled": false }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["emailNotifications"], false);

        let (status, body) = app.get(&format!("/user/{EMAIL}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["emailNotifications"], false);
    }
}
