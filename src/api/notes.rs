//! Note upload and listing.

use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::accounts::UserView;
use super::error::ApiError;
use super::AppState;
use crate::database::{Note, NoteMetadata};
use crate::upload::{FileType, UploadRequest, UploadedFile};

/// A note as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileType,
    #[serde(flatten)]
    pub metadata: NoteMetadata,
    pub channel: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id_hex(),
            title: note.title().to_string(),
            file_name: note.file_name.clone(),
            file_url: note.file_url.clone(),
            file_type: FileType::from_name(&note.file_name),
            metadata: note.metadata.clone(),
            channel: note.channel.clone(),
            uploaded_by: note.uploaded_by.clone(),
            uploaded_at: DateTime::from_timestamp_millis(note.uploaded_at.timestamp_millis())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub file_url: String,
    pub credits_earned: i64,
    pub file_type: FileType,
    pub note: NoteView,
    pub user: UserView,
    pub members_notified: usize,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request("File too large. Maximum 10MB.")
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Copy a text field into the request. Unknown fields are ignored.
fn apply_field(request: &mut UploadRequest, name: &str, value: String) {
    let metadata = &mut request.metadata;
    match name {
        "regulation" => metadata.regulation = value,
        "year" => metadata.year = value,
        "topic" => metadata.topic = value,
        "subject" => metadata.subject = value,
        "subjectCode" => metadata.subject_code = value,
        "description" => metadata.description = value,
        "uploadedBy" => request.uploaded_by = value,
        "channel" => request.channel = Some(value),
        _ => {}
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ApiError> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            // Browsers send an empty part when no file was picked.
            if !(file_name.is_empty() && bytes.is_empty()) {
                request.file = Some(UploadedFile {
                    name: file_name,
                    bytes,
                });
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            apply_field(&mut request, &name, value);
        }
    }

    Ok(request)
}

pub async fn upload_note(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::bad_request("No file uploaded"))?;
    let request = read_upload(multipart).await?;
    let receipt = state.uploads.upload(request).await?;

    Ok(Json(UploadResponse {
        message: "Note uploaded successfully!".to_string(),
        file_url: receipt.note.file_url.clone(),
        credits_earned: receipt.credits_earned,
        file_type: receipt.file_type,
        note: NoteView::from(&receipt.note),
        user: UserView::from(&receipt.user),
        members_notified: receipt.notified,
    }))
}

pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteView>>, ApiError> {
    let notes = state.store.notes.list_newest_first().await?;
    Ok(Json(notes.iter().map(NoteView::from).collect()))
}
