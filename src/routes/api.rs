// SPDX-License-Identifier: MIT

//! API routes for authenticated participants.

use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{GiftPreferences, User};
use crate::AppState;

/// Gift preferences take two likes and two dislikes.
const MAX_PREFERENCE_ENTRIES: usize = 2;
const MAX_PREFERENCE_LENGTH: usize = 200;

/// API routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/match", get(get_match))
        .route("/api/preferences", put(put_preferences))
        .route("/api/ready", post(toggle_ready))
}

async fn load_user(state: &AppState, user_id: u64) -> Result<User> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

// ─── Profile ─────────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub ready: bool,
    /// Whether an assignment exists; the receiver is only revealed via
    /// GET /api/match
    pub matched: bool,
    pub gift_preferences: GiftPreferences,
    pub price_range: String,
}

/// Get the current user's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let user = load_user(&state, auth.user_id).await?;
    let settings = state.store.get_settings().await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        is_admin: user.is_admin,
        ready: user.ready,
        matched: user.matched_with.is_some(),
        gift_preferences: user.gift_preferences,
        price_range: settings.price_range,
    }))
}

// ─── Assignment ──────────────────────────────────────────────

/// The resolved assignment shown to a giver.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub receiver: String,
    pub gift_preferences: GiftPreferences,
    pub price_range: String,
}

/// Get the current user's assignment, once matching has run.
async fn get_match(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MatchResponse>> {
    let users = state.store.get_users().await?;
    let user = users
        .iter()
        .find(|u| u.id == auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user_id)))?;

    let receiver_id = user
        .matched_with
        .ok_or_else(|| AppError::NotFound("No match assigned yet".to_string()))?;

    let receiver = users.iter().find(|u| u.id == receiver_id).ok_or_else(|| {
        tracing::error!(
            user_id = user.id,
            receiver_id,
            "matchedWith points at a missing user"
        );
        AppError::NotFound("No match assigned yet".to_string())
    })?;

    let settings = state.store.get_settings().await?;

    Ok(Json(MatchResponse {
        receiver: receiver.username.clone(),
        gift_preferences: receiver.gift_preferences.clone(),
        price_range: settings.price_range,
    }))
}

// ─── Preferences ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PreferencesRequest {
    likes: Vec<String>,
    dislikes: Vec<String>,
}

fn validate_entries(name: &str, entries: &[String]) -> Result<()> {
    if entries.len() > MAX_PREFERENCE_ENTRIES {
        return Err(AppError::BadRequest(format!(
            "At most {} {} entries are allowed",
            MAX_PREFERENCE_ENTRIES, name
        )));
    }
    if entries.iter().any(|e| e.len() > MAX_PREFERENCE_LENGTH) {
        return Err(AppError::BadRequest(format!(
            "{} entries must be at most {} characters",
            name, MAX_PREFERENCE_LENGTH
        )));
    }
    Ok(())
}

/// Save gift preferences. Saving preferences marks the user ready for
/// matching.
async fn put_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<PreferencesRequest>,
) -> Result<Json<MeResponse>> {
    validate_entries("likes", &body.likes)?;
    validate_entries("dislikes", &body.dislikes)?;

    let updated = state
        .store
        .update_user(auth.user_id, |u| {
            let mut u = u.clone();
            u.gift_preferences = GiftPreferences {
                likes: body.likes.clone(),
                dislikes: body.dislikes.clone(),
            };
            u.ready = true;
            u
        })
        .await?;

    tracing::info!(user_id = updated.id, "Preferences saved, user marked ready");

    let settings = state.store.get_settings().await?;
    Ok(Json(MeResponse {
        id: updated.id,
        username: updated.username,
        email: updated.email,
        is_admin: updated.is_admin,
        ready: updated.ready,
        matched: updated.matched_with.is_some(),
        gift_preferences: updated.gift_preferences,
        price_range: settings.price_range,
    }))
}

// ─── Ready Flag ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
}

/// Toggle the current user's ready flag.
async fn toggle_ready(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ReadyResponse>> {
    let updated = state
        .store
        .update_user(auth.user_id, |u| {
            let mut u = u.clone();
            u.ready = !u.ready;
            u
        })
        .await?;

    Ok(Json(ReadyResponse {
        ready: updated.ready,
    }))
}
