//! # User Handlers
//!
//! Enrolment (creating an identity to attach passkeys to) and the current
//! user's profile.

use crate::db::{credentials, users};
use crate::error::{AppError, AppResult};
use crate::handlers::ApiJson;
use crate::middleware::auth::{current_user_id, establish_session};
use crate::state::AppState;
use crate::webauthn::types::CreateUserRequest;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tower_sessions::Session;

/// Create an identity and sign it in
///
/// ## Route
/// POST /api/users
///
/// ## Request
/// ```json
/// { "handle": "alice@example.com", "displayName": "Alice Smith" }
/// ```
///
/// ## Response
/// ```json
/// { "success": true, "userId": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// The new session is what lets the client call `register/options` right
/// away. A taken handle is a 400.
pub async fn create_user(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> AppResult<Json<Value>> {
    let handle = req.handle.trim();
    if handle.is_empty() {
        return Err(AppError::BadRequest("handle must not be empty".to_string()));
    }
    let display_name = match req.display_name.trim() {
        "" => handle,
        name => name,
    };

    let user = users::create_user(&state.db, handle, display_name).await?;
    establish_session(&session, &user.id).await?;

    tracing::info!(user_id = %user.id, "user enrolled");

    Ok(Json(json!({
        "success": true,
        "userId": user.id
    })))
}

/// Get the signed-in user's profile and passkeys
///
/// ## Route
/// GET /api/users/me (behind `require_auth`)
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "handle": "alice@example.com",
///   "displayName": "Alice Smith",
///   "createdAt": "2024-01-15T10:30:00Z",
///   "credentials": [
///     { "id": "AAEC...", "signCount": 4, "createdAt": "...", "lastUsedAt": "..." }
///   ]
/// }
/// ```
///
/// Public keys are not returned.
pub async fn get_current_user(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let user_id = current_user_id(&session).await?;

    let user = users::find_by_id(&state.db, &user_id).await?;
    let passkeys: Vec<Value> = credentials::find_by_user_id(&state.db, &user.id)
        .await?
        .iter()
        .map(|c| {
            json!({
                "id": c.credential_id_b64(),
                "signCount": c.sign_count(),
                "createdAt": c.created_at,
                "lastUsedAt": c.last_used_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "id": user.id,
        "handle": user.handle,
        "displayName": user.display_name,
        "createdAt": user.created_at,
        "credentials": passkeys
    })))
}
