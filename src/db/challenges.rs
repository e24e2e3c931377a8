//! # Challenge Store
//!
//! Issues and consumes the random, single-use value each ceremony must sign.
//!
//! ## Single use
//! `consume` is one `DELETE ... RETURNING` statement, so reading and
//! deleting happen atomically: if two finish requests race for the same
//! user, only one of them gets the row back.
//!
//! ## Expiry
//! Rows carry an `expires_at`; an expired row is never returned. Dead rows
//! are purged whenever a new challenge is issued, so there is no background
//! cleanup task.

use crate::db::models::Challenge;
use crate::error::AppResult;
use crate::webauthn::client_data::Ceremony;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;

/// Issue a fresh challenge for `user_id`, replacing any outstanding one
pub async fn begin(
    pool: &SqlitePool,
    user_id: &str,
    ceremony: Ceremony,
    ttl: Duration,
) -> AppResult<Challenge> {
    purge_expired(pool).await?;

    let challenge = Challenge::new(user_id.to_string(), ceremony, ttl);

    sqlx::query(
        "INSERT INTO challenges (user_id, ceremony, challenge, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
             ceremony = excluded.ceremony,
             challenge = excluded.challenge,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at",
    )
    .bind(&challenge.user_id)
    .bind(&challenge.ceremony)
    .bind(&challenge.challenge)
    .bind(&challenge.created_at)
    .bind(challenge.expires_at)
    .execute(pool)
    .await?;

    tracing::debug!(user_id, ceremony = ceremony.as_str(), "challenge issued");

    Ok(challenge)
}

/// Take the user's outstanding challenge, deleting it
///
/// Returns `None` if there is none, if it has expired, or if it was issued
/// for the other ceremony. In every case the row is gone afterwards.
pub async fn consume(
    pool: &SqlitePool,
    user_id: &str,
    ceremony: Ceremony,
) -> AppResult<Option<Challenge>> {
    let challenge = sqlx::query_as::<_, Challenge>(
        "DELETE FROM challenges WHERE user_id = ?
         RETURNING user_id, ceremony, challenge, created_at, expires_at",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(challenge) = challenge else {
        return Ok(None);
    };

    if challenge.is_expired() {
        tracing::debug!(user_id, "challenge expired before use");
        return Ok(None);
    }

    if challenge.ceremony != ceremony.as_str() {
        tracing::debug!(
            user_id,
            issued_for = %challenge.ceremony,
            used_for = ceremony.as_str(),
            "challenge presented to the wrong ceremony"
        );
        return Ok(None);
    }

    Ok(Some(challenge))
}

async fn purge_expired(pool: &SqlitePool) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM challenges WHERE expires_at < ?")
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        tracing::debug!(purged = result.rows_affected(), "removed expired challenges");
    }

    Ok(())
}
