//! # WebAuthn Module
//!
//! Passkey ceremonies implemented directly on top of `p256` and `sha2`.
//!
//! ## Submodules
//! - `reader`: bounds-checked byte cursor
//! - `cbor`: decoder for the CBOR subset authenticators emit
//! - `cose`: COSE_Key to DER public key, and signature verification
//! - `authenticator_data`: the authenticator's binary envelope
//! - `client_data`: the browser's JSON envelope
//! - `relying_party`: RP ID / origin derived from the request host
//! - `registration`: creating new passkey credentials
//! - `authentication`: logging in with existing passkeys
//! - `types`: request/response types for the API
//! - `error`: ceremony failure codes
//!
//! ## WebAuthn Flow Overview
//!
//! ### Registration (Creating a Passkey)
//! 1. Signed-in client asks for options → `registration::start_registration()`
//! 2. Client passes the challenge to `navigator.credentials.create()`
//! 3. Client sends credential ID, authenticator data and client data back →
//!    `registration::finish_registration()`
//! 4. Server checks challenge, origin and key, then stores the public key
//!
//! ### Authentication (Logging In)
//! 1. Client names the identity → `authentication::start_authentication()`
//! 2. Client passes the challenge to `navigator.credentials.get()`
//! 3. Client sends the signed assertion → `authentication::finish_authentication()`
//! 4. Server verifies the signature with the stored key and the counter
//! 5. If valid, a session is created for the user

pub mod authentication;
pub mod authenticator_data;
pub mod cbor;
pub mod client_data;
pub mod cose;
pub mod error;
pub mod reader;
pub mod registration;
pub mod relying_party;
pub mod types;

use base64::prelude::*;

use crate::webauthn::error::CeremonyError;

/// Pull a required base64url field out of a request
///
/// Absent and empty are both `MissingField`.
fn required_bytes(value: Option<&str>, field: &'static str) -> Result<Vec<u8>, CeremonyError> {
    let value = required(value, field)?;
    BASE64_URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|_| CeremonyError::InvalidEncoding(field))
}

pub(crate) fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, CeremonyError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CeremonyError::MissingField(field)),
    }
}
