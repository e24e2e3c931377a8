//! # WebAuthn API Types
//!
//! Request/response bodies for the ceremony endpoints. All binary values are
//! base64url strings without padding; field names are camelCase on the wire.
//!
//! ## API Flow
//! Each ceremony has two steps:
//! - options: server issues a challenge, client passes it to the authenticator
//! - complete: client returns what the authenticator produced, server verifies

use serde::{Deserialize, Serialize};

use crate::db::models::Credential;

/// Request to create an identity (enrolment, before any passkey exists)
///
/// ## Example JSON
/// ```json
/// { "handle": "alice@example.com", "displayName": "Alice Smith" }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub handle: String,
    pub display_name: String,
}

/// `{ name, id }` of the relying party
#[derive(Debug, Clone, Serialize)]
pub struct RelyingPartyEntity {
    pub name: String,
    pub id: String,
}

/// The account the new credential is bound to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Opaque user handle (base64url)
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// Reference to an existing credential
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Credential ID (base64url)
    pub id: String,
}

impl From<&Credential> for CredentialDescriptor {
    fn from(credential: &Credential) -> Self {
        Self {
            kind: "public-key",
            id: credential.credential_id_b64(),
        }
    }
}

/// Returned by `register/options`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptions {
    pub challenge: String,
    pub relying_party: RelyingPartyEntity,
    pub user: UserEntity,
    /// COSE algorithm identifiers we accept (only ES256)
    pub algorithms: Vec<i64>,
    /// Credentials the user already has, so the client won't re-register them
    pub exclude_credentials: Vec<CredentialDescriptor>,
    /// Milliseconds the client should allow for the ceremony
    pub timeout: u64,
}

/// Returned by `authenticate/options`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub challenge: String,
    pub relying_party: RelyingPartyEntity,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub timeout: u64,
}

/// Request to complete passkey registration
///
/// Fields are optional so a missing one is reported as `missing_field`
/// rather than a generic JSON rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFinishRequest {
    pub credential_id: Option<String>,
    /// Raw authenticator data (from `getAuthenticatorData()`)
    pub authenticator_data: Option<String>,
    /// Raw clientDataJSON bytes
    pub client_data: Option<String>,
}

/// Request to start passkey authentication
///
/// ## Example JSON
/// ```json
/// { "identityHandle": "alice@example.com" }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationStartRequest {
    pub identity_handle: Option<String>,
}

/// Request to complete passkey authentication
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFinishRequest {
    pub identity_handle: Option<String>,
    pub credential_id: Option<String>,
    pub authenticator_data: Option<String>,
    pub client_data: Option<String>,
    /// DER-encoded ECDSA signature
    pub signature: Option<String>,
}
