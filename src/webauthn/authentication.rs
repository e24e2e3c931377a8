//! # Passkey Authentication Logic
//!
//! Server side of logging in with an existing passkey.
//!
//! ## Steps
//! 1. **Start**: issue a challenge bound to the named identity
//! 2. **Finish**: verify the signed assertion with the stored public key
//!
//! ## Order of checks in finish
//! 1. Required fields, identity, credential scoped to that identity
//! 2. Signature over the raw bytes
//! 3. Parse client data and authenticator data
//! 4. Consume the challenge
//! 5. Challenge, ceremony type and origin; RP ID hash and user presence
//! 6. Counter, then the compare-and-set commit
//!
//! The signature is checked before anything inside the signed bytes is
//! interpreted, so any altered byte fails as `InvalidSignature`. Nothing
//! that fails before step 4 costs the caller their challenge.
//!
//! ## Signature counter
//! Authenticators that count send a strictly increasing value. A nonzero
//! value that is not greater than the stored one suggests a cloned
//! authenticator and is rejected. A zero value means "not counting" and is
//! accepted without touching the stored counter.

use sha2::{Digest, Sha256};

use crate::db::models::User;
use crate::db::{challenges, credentials, users};
use crate::error::{AppError, AppResult, SECURITY_LOG_TARGET};
use crate::state::AppState;
use crate::webauthn::authenticator_data::AuthenticatorData;
use crate::webauthn::client_data::{Ceremony, ClientData};
use crate::webauthn::cose::PublicKey;
use crate::webauthn::error::CeremonyError;
use crate::webauthn::registration::timeout_ms;
use crate::webauthn::relying_party::RelyingParty;
use crate::webauthn::types::*;
use crate::webauthn::{required, required_bytes};

/// Start passkey authentication for `identity_handle`
///
/// Returns the challenge and the identity's credentials as
/// `allowCredentials`. An identity with no credentials cannot log in and is
/// reported the same way as an unknown one.
///
/// ## Errors
/// - UnknownIdentity: no such handle, or no passkeys registered
/// - Database: lookup or challenge write failed
pub async fn start_authentication(
    state: &AppState,
    rp: &RelyingParty,
    identity_handle: &str,
) -> AppResult<RequestOptions> {
    let user = users::find_by_handle(&state.db, identity_handle)
        .await?
        .ok_or(CeremonyError::UnknownIdentity)?;

    let user_credentials = credentials::find_by_user_id(&state.db, &user.id).await?;
    if user_credentials.is_empty() {
        return Err(CeremonyError::UnknownIdentity.into());
    }

    let challenge = challenges::begin(
        &state.db,
        &user.id,
        Ceremony::Authentication,
        state.config.challenge_ttl(),
    )
    .await?;

    Ok(RequestOptions {
        challenge: challenge.challenge,
        relying_party: RelyingPartyEntity {
            name: rp.name.clone(),
            id: rp.id.clone(),
        },
        allow_credentials: user_credentials.iter().map(CredentialDescriptor::from).collect(),
        timeout: timeout_ms(state),
    })
}

/// Finish passkey authentication
///
/// On success the stored counter has been advanced (when the authenticator
/// counts) and the authenticated user is returned. The caller establishes
/// the session.
///
/// ## Errors
/// Any [`CeremonyError`]. `InvalidSignature` and `PossibleCloning` are also
/// logged on the security target.
pub async fn finish_authentication(
    state: &AppState,
    rp: &RelyingParty,
    req: &AuthenticationFinishRequest,
) -> AppResult<User> {
    let identity_handle = required(req.identity_handle.as_deref(), "identityHandle")?;
    let credential_id = required_bytes(req.credential_id.as_deref(), "credentialId")?;
    let authenticator_data = required_bytes(req.authenticator_data.as_deref(), "authenticatorData")?;
    let client_data_raw = required_bytes(req.client_data.as_deref(), "clientData")?;
    let signature = required_bytes(req.signature.as_deref(), "signature")?;

    let user = users::find_by_handle(&state.db, identity_handle)
        .await?
        .ok_or(CeremonyError::UnknownIdentity)?;

    let credential = credentials::find_for_user(&state.db, &user.id, &credential_id)
        .await?
        .ok_or(CeremonyError::CredentialNotFound)?;

    let public_key = PublicKey::from_der(credential.public_key.clone())
        .map_err(|e| AppError::Internal(format!("stored key for credential {} is unusable: {e}", credential.id)))?;

    let mut signed = authenticator_data.clone();
    signed.extend_from_slice(&Sha256::digest(&client_data_raw));
    if !public_key.verify(&signed, &signature) {
        tracing::warn!(
            target: SECURITY_LOG_TARGET,
            user_id = %user.id,
            credential = %credential.id,
            "assertion signature did not verify"
        );
        return Err(CeremonyError::InvalidSignature.into());
    }

    // Structural checks come before the challenge is touched
    let client_data = ClientData::parse(&client_data_raw)?;
    let auth_data = AuthenticatorData::parse_assertion(&authenticator_data)?;

    // Single use from here on: whatever happens next, this challenge is gone
    let challenge = challenges::consume(&state.db, &user.id, Ceremony::Authentication)
        .await?
        .ok_or(CeremonyError::ChallengeExpired)?;
    let expected_challenge = challenge
        .bytes()
        .ok_or_else(|| AppError::Internal("stored challenge is not base64url".to_string()))?;
    client_data.verify(&expected_challenge, Ceremony::Authentication, &rp.origin)?;

    if auth_data.rp_id_hash != rp.id_hash() {
        return Err(CeremonyError::RelyingPartyMismatch.into());
    }
    if !auth_data.user_present() {
        return Err(CeremonyError::UserNotPresent.into());
    }

    let stored_count = credential.sign_count();
    let presented = auth_data.sign_count;
    if presented != 0 && presented <= stored_count {
        tracing::warn!(
            target: SECURITY_LOG_TARGET,
            user_id = %user.id,
            credential = %credential.id,
            stored_count,
            presented,
            "signature counter did not advance; authenticator may be cloned"
        );
        return Err(CeremonyError::PossibleCloning.into());
    }

    if presented == 0 {
        credentials::touch(&state.db, &credential.id).await?;
    } else if !credentials::advance_sign_count(&state.db, &credential.id, presented).await? {
        // Lost the race to a concurrent assertion with an equal or higher counter
        tracing::warn!(
            target: SECURITY_LOG_TARGET,
            user_id = %user.id,
            credential = %credential.id,
            presented,
            "signature counter was advanced concurrently"
        );
        return Err(CeremonyError::PossibleCloning.into());
    }

    tracing::info!(
        user_id = %user.id,
        credential = %credential.id,
        sign_count = presented,
        user_verified = auth_data.user_verified(),
        "passkey authentication succeeded"
    );

    Ok(user)
}
