//! # Credential Database Operations
//!
//! CRUD for registered passkeys.
//!
//! ## Invariants
//! - `credential_id` is unique across all users; the unique index enforces
//!   it and a clash surfaces as `DuplicateCredential`, never an overwrite.
//! - `sign_count` only moves forward. The update is a compare-and-set, so
//!   two concurrent logins with the same credential cannot move it back.
//!
//! ## Security Note
//! Only public keys are stored - private keys never leave the user's device.

use crate::db::models::Credential;
use crate::error::{AppError, AppResult};
use crate::webauthn::error::CeremonyError;
use chrono::Utc;
use sqlx::SqlitePool;

/// Save a newly registered credential
///
/// A single INSERT: either the whole row lands or nothing does.
pub async fn insert(pool: &SqlitePool, credential: &Credential) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO credentials
         (id, user_id, credential_id, public_key, sign_count, created_at, last_used_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&credential.id)
    .bind(&credential.user_id)
    .bind(&credential.credential_id)
    .bind(&credential.public_key)
    .bind(credential.sign_count)
    .bind(&credential.created_at)
    .bind(&credential.last_used_at)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Ceremony(CeremonyError::DuplicateCredential)
        }
        _ => AppError::Database(e),
    })?;

    Ok(())
}

/// Get all credentials for a user, oldest first
///
/// Returns an empty vector if the user has none.
pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Credential>> {
    let credentials = sqlx::query_as::<_, Credential>(
        "SELECT * FROM credentials WHERE user_id = ? ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(credentials)
}

/// Find a credential by its authenticator-chosen ID, scoped to one user
///
/// A credential ID belonging to someone else is reported as absent.
pub async fn find_for_user(
    pool: &SqlitePool,
    user_id: &str,
    credential_id: &[u8],
) -> AppResult<Option<Credential>> {
    let credential = sqlx::query_as::<_, Credential>(
        "SELECT * FROM credentials WHERE user_id = ? AND credential_id = ?",
    )
    .bind(user_id)
    .bind(credential_id)
    .fetch_optional(pool)
    .await?;

    Ok(credential)
}

/// Move the signature counter forward after a successful authentication
///
/// Only applies if `new_count` is greater than the stored value. Returns
/// `false` when the row was not updated, meaning another request already
/// recorded an equal or higher counter.
pub async fn advance_sign_count(
    pool: &SqlitePool,
    id: &str,
    new_count: u32,
) -> AppResult<bool> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE credentials
         SET sign_count = ?, last_used_at = ?
         WHERE id = ? AND sign_count < ?",
    )
    .bind(i64::from(new_count))
    .bind(now)
    .bind(id)
    .bind(i64::from(new_count))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a use of a credential whose authenticator does not count
pub async fn touch(pool: &SqlitePool, id: &str) -> AppResult<()> {
    sqlx::query("UPDATE credentials SET last_used_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
