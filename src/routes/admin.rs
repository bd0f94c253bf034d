// SPDX-License-Identifier: MIT

//! Admin routes: roster management, matching, notifications, settings.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::matching::generate_matches;
use crate::middleware::auth::hash_password;
use crate::models::User;
use crate::store::{ExchangeSettings, NewUser};
use crate::AppState;

/// Admin routes (require authentication and admin).
/// Both middlewares are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users).post(add_user))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/users/{id}/ready", post(toggle_user_ready))
        .route("/admin/matches", post(run_matching))
        .route("/admin/rematch", post(rematch))
        .route("/admin/matches/reset", post(reset_matches))
        .route("/admin/notifications", post(send_notifications))
        .route("/admin/settings", get(get_settings).put(update_settings))
}

// ─── Roster ──────────────────────────────────────────────────

/// One participant row in the admin roster.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub ready: bool,
    pub matched_with: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStats {
    pub total: usize,
    pub ready: usize,
    pub not_ready: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub users: Vec<RosterEntry>,
    pub stats: RosterStats,
}

/// List all non-admin users with readiness stats.
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<RosterResponse>> {
    let users = state.store.get_users().await?;

    let entries: Vec<RosterEntry> = users
        .iter()
        .filter(|u| !u.is_admin)
        .map(|u| RosterEntry {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            ready: u.ready,
            matched_with: u.matched_with,
        })
        .collect();

    let ready = entries.iter().filter(|e| e.ready).count();
    let stats = RosterStats {
        total: entries.len(),
        ready,
        not_ready: entries.len() - ready,
    };

    Ok(Json(RosterResponse {
        users: entries,
        stats,
    }))
}

#[derive(Deserialize)]
pub struct AddUserRequest {
    username: String,
    email: Option<String>,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserResponse {
    pub id: u64,
    pub username: String,
}

/// Create a new participant.
async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddUserRequest>,
) -> Result<Json<AddUserResponse>> {
    if body.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".to_string()));
    }
    if body.password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".to_string()));
    }

    let password_hash = hash_password(&body.password)?;

    let user = state
        .store
        .add_user(NewUser {
            username: body.username.trim().to_string(),
            email: body.email,
            password_hash,
            is_admin: false,
        })
        .await?;

    tracing::info!(id = user.id, username = %user.username, "Participant added");

    Ok(Json(AddUserResponse {
        id: user.id,
        username: user.username,
    }))
}

/// Remove a participant.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>> {
    state.store.delete_user(id).await?;
    tracing::info!(id, "Participant deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Toggle a participant's ready flag on their behalf.
async fn toggle_user_ready(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>> {
    let updated = state
        .store
        .update_user(id, |u| {
            let mut u = u.clone();
            u.ready = !u.ready;
            u
        })
        .await?;

    Ok(Json(serde_json::json!({ "id": id, "ready": updated.ready })))
}

// ─── Matching ────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRunResponse {
    pub matches_generated: usize,
}

fn require_all_ready(users: &[User]) -> Result<()> {
    let not_ready = users.iter().filter(|u| !u.is_admin && !u.ready).count();
    if not_ready > 0 {
        return Err(AppError::BadRequest(format!(
            "All participants must be ready before generating matches ({} not ready)",
            not_ready
        )));
    }
    Ok(())
}

/// Persist the outcome of a matching round.
///
/// A storage failure here means the matches were computed but never
/// saved; that is logged as its own failure mode so the admin knows no
/// user records changed.
async fn persist_matches(state: &AppState, updated_users: &[User], count: usize) -> Result<()> {
    state.store.save_users(updated_users).await.map_err(|e| {
        tracing::error!(error = %e, matches = count, "Matches computed but not saved");
        AppError::Storage(format!("matches computed but not saved: {}", e))
    })
}

/// Run a matching round over the current roster.
async fn run_matching(State(state): State<Arc<AppState>>) -> Result<Json<MatchRunResponse>> {
    let users = state.store.get_users().await?;
    require_all_ready(&users)?;

    tracing::info!(total_users = users.len(), "Starting match generation");
    let outcome = generate_matches(&users)?;

    persist_matches(&state, &outcome.updated_users, outcome.matches.len()).await?;

    tracing::info!(matches = outcome.matches.len(), "Matches generated");
    Ok(Json(MatchRunResponse {
        matches_generated: outcome.matches.len(),
    }))
}

/// Clear all existing assignments, then run a fresh matching round.
async fn rematch(State(state): State<Arc<AppState>>) -> Result<Json<MatchRunResponse>> {
    let users = state.store.get_users().await?;
    require_all_ready(&users)?;

    let cleared: Vec<User> = users.iter().map(|u| u.with_matched_with(None)).collect();
    let outcome = generate_matches(&cleared)?;

    persist_matches(&state, &outcome.updated_users, outcome.matches.len()).await?;

    tracing::info!(matches = outcome.matches.len(), "Matches regenerated");
    Ok(Json(MatchRunResponse {
        matches_generated: outcome.matches.len(),
    }))
}

/// Clear all assignments, preserving preferences and ready status.
async fn reset_matches(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    state.store.reset_matches().await?;
    tracing::info!("Matches reset");
    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Serialize)]
pub struct NotifyResponse {
    pub sent: usize,
    pub failed: usize,
}

/// Email every matched giver their assignment.
///
/// Failures are independent per recipient; one bounced address never
/// stops the rest of the batch.
async fn send_notifications(State(state): State<Arc<AppState>>) -> Result<Json<NotifyResponse>> {
    let users = state.store.get_users().await?;
    let settings = state.store.get_settings().await?;

    let givers: Vec<&User> = users
        .iter()
        .filter(|u| !u.is_admin && u.matched_with.is_some())
        .collect();

    if givers.is_empty() {
        return Err(AppError::BadRequest(
            "No matches found to send emails for".to_string(),
        ));
    }

    let mut sent = 0;
    let mut failed = 0;

    for giver in givers {
        let Some(receiver) = giver
            .matched_with
            .and_then(|id| users.iter().find(|u| u.id == id))
        else {
            tracing::warn!(giver_id = giver.id, "Giver matched with missing user");
            failed += 1;
            continue;
        };

        match state
            .mail
            .send_match_notification(giver, receiver, &settings.price_range)
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::warn!(giver_id = giver.id, error = %e, "Notification failed");
                failed += 1;
            }
        }
    }

    tracing::info!(sent, failed, "Notification batch complete");
    Ok(Json(NotifyResponse { sent, failed }))
}

// ─── Settings ────────────────────────────────────────────────

/// Get exchange settings.
async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<ExchangeSettings>> {
    Ok(Json(state.store.get_settings().await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    price_range: String,
}

/// Update exchange settings.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<ExchangeSettings>> {
    if body.price_range.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Price range must not be empty".to_string(),
        ));
    }

    let settings = ExchangeSettings {
        price_range: body.price_range.trim().to_string(),
    };
    state.store.update_settings(&settings).await?;

    tracing::info!(price_range = %settings.price_range, "Settings updated");
    Ok(Json(settings))
}
