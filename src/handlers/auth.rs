//! # Ceremony Handlers
//!
//! HTTP surface of the registration and authentication ceremonies, plus
//! logout and session inspection.
//!
//! The relying party is resolved from the `Host` header on every ceremony
//! request; a host outside `RP_HOSTS` is refused before any other work.

use crate::error::{AppError, AppResult};
use crate::handlers::ApiJson;
use crate::middleware::auth::{current_user_id, establish_session, USER_ID_KEY};
use crate::state::AppState;
use crate::webauthn::relying_party::RelyingParty;
use crate::webauthn::types::*;
use crate::webauthn::{authentication, registration, required};
use axum::{
    extract::{Host, State},
    Json,
};
use serde_json::{json, Value};
use tower_sessions::Session;

// Registration endpoints (signed-in user adds a passkey)

/// POST /api/auth/register/options
pub async fn register_options(
    State(state): State<AppState>,
    Host(host): Host,
    session: Session,
) -> AppResult<Json<CreationOptions>> {
    let rp = RelyingParty::from_host(&state.config, &host)?;
    let user_id = current_user_id(&session).await?;

    let options = registration::start_registration(&state, &rp, &user_id).await?;

    Ok(Json(options))
}

/// POST /api/auth/register/complete
pub async fn register_complete(
    State(state): State<AppState>,
    Host(host): Host,
    session: Session,
    ApiJson(req): ApiJson<RegistrationFinishRequest>,
) -> AppResult<Json<Value>> {
    let rp = RelyingParty::from_host(&state.config, &host)?;
    let user_id = current_user_id(&session).await?;

    registration::finish_registration(&state, &rp, &user_id, &req).await?;

    Ok(Json(json!({
        "success": true
    })))
}

// Authentication endpoints (log in with a passkey)

/// POST /api/auth/authenticate/options
pub async fn authenticate_options(
    State(state): State<AppState>,
    Host(host): Host,
    ApiJson(req): ApiJson<AuthenticationStartRequest>,
) -> AppResult<Json<RequestOptions>> {
    let rp = RelyingParty::from_host(&state.config, &host)?;
    let identity_handle = required(req.identity_handle.as_deref(), "identityHandle")?;

    let options = authentication::start_authentication(&state, &rp, identity_handle).await?;

    Ok(Json(options))
}

/// POST /api/auth/authenticate/complete
///
/// On success the caller is signed in: the response carries a fresh session
/// cookie.
pub async fn authenticate_complete(
    State(state): State<AppState>,
    Host(host): Host,
    session: Session,
    ApiJson(req): ApiJson<AuthenticationFinishRequest>,
) -> AppResult<Json<Value>> {
    let rp = RelyingParty::from_host(&state.config, &host)?;

    let user = authentication::finish_authentication(&state, &rp, &req).await?;
    establish_session(&session, &user.id).await?;

    Ok(Json(json!({
        "success": true,
        "userId": user.id
    })))
}

pub async fn logout(session: Session) -> AppResult<Json<Value>> {
    session
        .delete()
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}

pub async fn session_info(session: Session) -> AppResult<Json<Value>> {
    let user_id: Option<String> = session
        .get(USER_ID_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    match user_id {
        Some(id) => Ok(Json(json!({
            "authenticated": true,
            "userId": id
        }))),
        None => Ok(Json(json!({
            "authenticated": false
        }))),
    }
}
