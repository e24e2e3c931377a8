//! # Database Models
//!
//! Structs that map to rows of the `users`, `credentials` and `challenges`
//! tables (see `migrations/`).
//!
//! ## Why Strings for dates?
//! SQLite stores timestamps as text (RFC 3339), which also serializes
//! straight to JSON. The one exception is `Challenge::expires_at`, kept as
//! unix seconds so the expiry comparison in SQL is numeric rather than a
//! string comparison.

use base64::prelude::*;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::webauthn::client_data::Ceremony;

/// An identity known to the application
///
/// Owned by the surrounding application; the passkey code only looks users
/// up. Each user can hold several credentials (one per device).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    /// Example: "550e8400-e29b-41d4-a716-446655440000"
    pub id: String,

    /// Public-facing identifier used to start a login, e.g. an e-mail address
    pub handle: String,

    /// Human-readable display name, shown during passkey creation
    pub display_name: String,

    /// RFC 3339 timestamps
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Create a new user with generated ID and timestamps
    pub fn new(handle: String, display_name: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            handle,
            display_name,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Opaque WebAuthn user handle: the 16 raw bytes of the UUID
    ///
    /// Falls back to the UTF-8 bytes of the id for rows not created by
    /// [`User::new`].
    pub fn user_handle(&self) -> Vec<u8> {
        match Uuid::parse_str(&self.id) {
            Ok(uuid) => uuid.as_bytes().to_vec(),
            Err(_) => self.id.as_bytes().to_vec(),
        }
    }
}

/// A registered passkey
///
/// ## What is stored?
/// - **credential_id**: chosen by the authenticator; the lookup key at login
/// - **public_key**: P-256 SubjectPublicKeyInfo DER, written once
/// - **sign_count**: last counter value accepted from the authenticator
///
/// Only the public key is stored. The private key never leaves the device.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    /// Internal record identifier (UUID v4)
    pub id: String,

    /// Owning user (foreign key to users)
    pub user_id: String,

    /// Raw credential ID bytes; unique across all users
    pub credential_id: Vec<u8>,

    /// DER-encoded public key
    pub public_key: Vec<u8>,

    /// Signature counter; holds a u32 (SQLite has no unsigned type)
    pub sign_count: i64,

    pub created_at: String,

    /// Set on every successful authentication
    pub last_used_at: Option<String>,
}

impl Credential {
    /// A freshly registered credential, counter at zero
    pub fn new(user_id: String, credential_id: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            credential_id,
            public_key,
            sign_count: 0,
            created_at: Utc::now().to_rfc3339(),
            last_used_at: None,
        }
    }

    pub fn sign_count(&self) -> u32 {
        u32::try_from(self.sign_count).unwrap_or(u32::MAX)
    }

    /// base64url form of the credential ID, as exchanged with clients
    pub fn credential_id_b64(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(&self.credential_id)
    }
}

/// A single-use ceremony challenge
///
/// ## Lifecycle
/// 1. Begin step creates it (replacing any earlier one for the user)
/// 2. Client signs over it
/// 3. Finish step deletes it and, if still valid, checks it
///
/// There is at most one row per user; a challenge is only good for the
/// ceremony it was issued for.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Challenge {
    /// Owning user; also the primary key
    pub user_id: String,

    /// "registration" or "authentication"
    pub ceremony: String,

    /// base64url (no padding) of 32 random bytes
    pub challenge: String,

    pub created_at: String,

    /// Unix seconds after which the challenge is dead
    pub expires_at: i64,
}

impl Challenge {
    /// Generate a new random challenge that lives for `ttl`
    pub fn new(user_id: String, ceremony: Ceremony, ttl: Duration) -> Self {
        let now = Utc::now();
        let bytes: [u8; 32] = rand::random();

        Self {
            user_id,
            ceremony: ceremony.as_str().to_string(),
            challenge: BASE64_URL_SAFE_NO_PAD.encode(bytes),
            created_at: now.to_rfc3339(),
            expires_at: (now + ttl).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.expires_at
    }

    /// Raw challenge bytes
    pub fn bytes(&self) -> Option<Vec<u8>> {
        BASE64_URL_SAFE_NO_PAD.decode(self.challenge.as_bytes()).ok()
    }
}
