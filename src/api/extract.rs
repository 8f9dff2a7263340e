//! JSON extractor whose rejections use the API error body.

use axum::extract::FromRequest;

use super::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
