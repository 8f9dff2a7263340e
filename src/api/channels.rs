//! Channel creation, membership and details.

use axum::Json;
use axum::extract::{Path, State};
use mongodb::bson::oid::ObjectId;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::accounts::MessageResponse;
use super::error::ApiError;
use super::extract::ApiJson;
use super::notes::NoteView;
use super::{AppState, normalize_email};
use crate::database::{Channel, ChannelMember, ChannelStore, JoinOutcome, StoreError, User};

const CODE_LENGTH: usize = 10;

/// Insert attempts before giving up on finding an unused join code.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Random join code over `[A-Za-z0-9]`.
fn generate_channel_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Insert `channel`, drawing a new code whenever the unique index rejects one.
async fn insert_with_fresh_code(
    channels: &dyn ChannelStore,
    channel: &mut Channel,
    mut next_code: impl FnMut() -> String,
) -> Result<ObjectId, ApiError> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        channel.code = next_code();
        match channels.insert(channel).await {
            Ok(id) => {
                channel.id = Some(id);
                return Ok(id);
            }
            Err(StoreError::Duplicate(_)) => {
                warn!("Channel code collision on attempt {}", attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::internal(
        "Failed to create channel.",
        anyhow::anyhow!("no free channel code after {MAX_CODE_ATTEMPTS} attempts"),
    ))
}

fn parse_channel_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::not_found("Channel not found"))
}

async fn find_user(state: &AppState, email: &str) -> Result<User, ApiError> {
    state
        .store
        .users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// A channel as listed for one user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub code: String,
    pub created_by: String,
    pub member_count: usize,
    pub note_count: usize,
    pub is_admin: bool,
}

impl ChannelSummary {
    fn for_user(channel: &Channel, email: &str) -> Self {
        Self {
            id: channel.id_hex(),
            name: channel.name.clone(),
            code: channel.code.clone(),
            created_by: channel.created_by.clone(),
            member_count: channel.members.len(),
            note_count: channel.notes.len(),
            is_admin: channel.is_admin(email),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub message: String,
    pub channel: ChannelSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub name: String,
    pub created_by: String,
}

pub async fn create_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateChannelRequest>,
) -> Result<Json<ChannelResponse>, ApiError> {
    let owner = find_user(&state, &req.created_by).await?;
    let owner_id = owner.id.ok_or(StoreError::MissingId)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Channel name is required"));
    }

    let admin = ChannelMember::new(owner_id, &owner.username, &owner.email, true);
    let mut channel = Channel::new(name, String::new(), admin);
    let channel_id =
        insert_with_fresh_code(state.store.channels.as_ref(), &mut channel, generate_channel_code)
            .await?;
    state.store.users.add_channel(owner_id, channel_id).await?;

    info!("Channel \"{}\" ({}) created by {}", channel.name, channel.code, owner.email);
    Ok(Json(ChannelResponse {
        message: "Channel created successfully".to_string(),
        channel: ChannelSummary::for_user(&channel, &owner.email),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinChannelRequest {
    pub code: String,
    pub user_email: String,
}

pub async fn join_channel(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<JoinChannelRequest>,
) -> Result<Json<ChannelResponse>, ApiError> {
    let user = find_user(&state, &req.user_email).await?;
    let user_id = user.id.ok_or(StoreError::MissingId)?;

    let channel = state
        .store
        .channels
        .find_by_code(req.code.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;
    let channel_id = channel.id.ok_or(StoreError::MissingId)?;
    if channel.is_member(&user.email) {
        return Err(ApiError::bad_request("You are already a member of this channel"));
    }

    let member = ChannelMember::new(user_id, &user.username, &user.email, false);
    match state.store.channels.add_member(channel_id, &member).await? {
        JoinOutcome::Joined => {}
        JoinOutcome::AlreadyMember => {
            return Err(ApiError::bad_request("You are already a member of this channel"));
        }
        JoinOutcome::ChannelMissing => return Err(ApiError::not_found("Channel not found")),
    }
    state.store.users.add_channel(user_id, channel_id).await?;

    let channel = state
        .store
        .channels
        .find_by_id(channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    info!("{} joined channel \"{}\"", user.email, channel.name);
    Ok(Json(ChannelResponse {
        message: "Joined channel successfully".to_string(),
        channel: ChannelSummary::for_user(&channel, &user.email),
    }))
}

pub async fn user_channels(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<ChannelSummary>>, ApiError> {
    let user = find_user(&state, &email).await?;
    let channels = state.store.channels.find_many(&user.joined_channels).await?;

    Ok(Json(
        channels
            .iter()
            .map(|c| ChannelSummary::for_user(c, &user.email))
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub code: String,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub struct ChannelDetailsResponse {
    pub channel: ChannelInfo,
    pub members: Vec<MemberView>,
    pub notes: Vec<NoteView>,
}

pub async fn channel_details(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelDetailsResponse>, ApiError> {
    let id = parse_channel_id(&channel_id)?;
    let channel = state
        .store
        .channels
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;
    let notes = state.store.notes.find_many(&channel.notes).await?;

    Ok(Json(ChannelDetailsResponse {
        members: channel
            .members
            .iter()
            .map(|m| MemberView {
                id: m.user_id.to_hex(),
                username: m.username.clone(),
                email: m.email.clone(),
                is_admin: m.is_admin,
            })
            .collect(),
        notes: notes.iter().map(NoteView::from).collect(),
        channel: ChannelInfo {
            id: channel.id_hex(),
            name: channel.name,
            code: channel.code,
            created_by: channel.created_by,
        },
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub channel_id: String,
    pub user_id: String,
    pub current_user_email: String,
}

pub async fn remove_member(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RemoveMemberRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let channel_id = parse_channel_id(&req.channel_id)?;
    let channel = state
        .store
        .channels
        .find_by_id(channel_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    if !channel.is_admin(req.current_user_email.trim()) {
        return Err(ApiError::Forbidden("Only admin can remove users".to_string()));
    }

    let user_id = ObjectId::parse_str(req.user_id.trim())
        .map_err(|_| ApiError::bad_request("Invalid user id"))?;
    if !state.store.channels.remove_member(channel_id, user_id).await? {
        return Err(ApiError::not_found("User is not a member of this channel"));
    }
    state.store.users.remove_channel(user_id, channel_id).await?;

    info!("Removed {} from channel \"{}\"", user_id, channel.name);
    Ok(MessageResponse::json("User removed successfully"))
}
