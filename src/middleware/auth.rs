//! # Session Authentication
//!
//! The login session is a tower-sessions cookie whose server-side record
//! holds the signed-in user's ID under [`USER_ID_KEY`].

use crate::error::{AppError, AppResult};
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

/// Session key holding the authenticated user's ID
pub const USER_ID_KEY: &str = "user_id";

/// The signed-in user's ID, or `Unauthorized`
pub async fn current_user_id(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_ID_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
}

/// Sign `user_id` in on this session
///
/// The session ID is cycled first so a cookie issued before login cannot be
/// reused after it.
pub async fn establish_session(session: &Session, user_id: &str) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;
    session
        .insert(USER_ID_KEY, user_id)
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?;

    Ok(())
}

/// Reject requests without a signed-in user
pub async fn require_auth(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    current_user_id(&session).await?;

    Ok(next.run(request).await)
}
