//! # Passkey Registration Logic
//!
//! Server side of creating a new passkey for a signed-in user. Two steps:
//!
//! 1. **Start**: issue a challenge and describe the credential we want
//! 2. **Finish**: check what the authenticator produced and store its key
//!
//! ## What finish verifies
//! - the challenge is ours, unexpired, and used only once
//! - the client data says `webauthn.create` on our exact origin
//! - the authenticator data names our RP ID and asserts user presence
//! - the credential ID the client reports is the one inside the
//!   authenticator data
//! - the public key is a well-formed P-256 key
//!
//! Attestation statements are not checked: the embedded public key is
//! trusted as-is ("self" attestation).

use crate::db::models::Credential;
use crate::db::{challenges, credentials, users};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webauthn::authenticator_data::AuthenticatorData;
use crate::webauthn::client_data::{Ceremony, ClientData};
use crate::webauthn::cose::{PublicKey, ES256};
use crate::webauthn::error::CeremonyError;
use crate::webauthn::relying_party::RelyingParty;
use crate::webauthn::required_bytes;
use crate::webauthn::types::*;
use base64::prelude::*;

/// Start the passkey registration process
///
/// Issues a fresh registration challenge for `user_id` (replacing any
/// outstanding one) and returns the options the client hands to
/// `navigator.credentials.create()`.
///
/// The user's existing credentials are listed in `excludeCredentials` so an
/// authenticator that is already registered refuses to register again.
///
/// ## Errors
/// - NotFound: the session's user no longer exists
/// - Database: reading credentials or storing the challenge failed
pub async fn start_registration(
    state: &AppState,
    rp: &RelyingParty,
    user_id: &str,
) -> AppResult<CreationOptions> {
    let user = users::find_by_id(&state.db, user_id).await?;
    let existing = credentials::find_by_user_id(&state.db, &user.id).await?;

    let challenge = challenges::begin(
        &state.db,
        &user.id,
        Ceremony::Registration,
        state.config.challenge_ttl(),
    )
    .await?;

    Ok(CreationOptions {
        challenge: challenge.challenge,
        relying_party: RelyingPartyEntity {
            name: rp.name.clone(),
            id: rp.id.clone(),
        },
        user: UserEntity {
            id: BASE64_URL_SAFE_NO_PAD.encode(user.user_handle()),
            name: user.handle.clone(),
            display_name: user.display_name.clone(),
        },
        algorithms: vec![ES256],
        exclude_credentials: existing.iter().map(CredentialDescriptor::from).collect(),
        timeout: timeout_ms(state),
    })
}

/// Finish the passkey registration process
///
/// ## Flow
/// 1. Require and decode `credentialId`, `authenticatorData`, `clientData`
/// 2. Parse both envelopes (malformed input stops here, before any state
///    changes)
/// 3. Consume the stored challenge
/// 4. Check challenge, ceremony type and origin in the client data
/// 5. Check RP ID hash, user presence and credential ID in the
///    authenticator data
/// 6. Rebuild the public key
/// 7. Insert the credential with a zero counter
///
/// ## Errors
/// Any [`CeremonyError`]; `DuplicateCredential` if the credential ID is
/// already registered to anyone.
pub async fn finish_registration(
    state: &AppState,
    rp: &RelyingParty,
    user_id: &str,
    req: &RegistrationFinishRequest,
) -> AppResult<Credential> {
    let credential_id = required_bytes(req.credential_id.as_deref(), "credentialId")?;
    let authenticator_data = required_bytes(req.authenticator_data.as_deref(), "authenticatorData")?;
    let client_data_raw = required_bytes(req.client_data.as_deref(), "clientData")?;

    let client_data = ClientData::parse(&client_data_raw)?;
    let auth_data = AuthenticatorData::parse_registration(&authenticator_data)?;
    let attested = auth_data
        .attested_credential
        .as_ref()
        .ok_or(CeremonyError::MalformedAuthenticatorData)?;

    let user = users::find_by_id(&state.db, user_id).await?;

    let challenge = challenges::consume(&state.db, &user.id, Ceremony::Registration)
        .await?
        .ok_or(CeremonyError::ChallengeExpired)?;
    let expected_challenge = challenge
        .bytes()
        .ok_or_else(|| AppError::Internal("stored challenge is not base64url".to_string()))?;

    client_data.verify(&expected_challenge, Ceremony::Registration, &rp.origin)?;

    if auth_data.rp_id_hash != rp.id_hash() {
        return Err(CeremonyError::RelyingPartyMismatch.into());
    }
    if !auth_data.user_present() {
        return Err(CeremonyError::UserNotPresent.into());
    }
    if attested.credential_id != credential_id {
        return Err(CeremonyError::CredentialIdMismatch.into());
    }

    let public_key = PublicKey::from_cose(&attested.public_key).map_err(CeremonyError::from)?;

    let credential = Credential::new(user.id.clone(), credential_id, public_key.as_der().to_vec());
    credentials::insert(&state.db, &credential).await?;

    tracing::info!(
        user_id = %user.id,
        credential = %credential.id,
        aaguid = %BASE64_URL_SAFE_NO_PAD.encode(attested.aaguid),
        user_verified = auth_data.user_verified(),
        "passkey registered"
    );

    Ok(credential)
}

pub(crate) fn timeout_ms(state: &AppState) -> u64 {
    u64::try_from(state.config.challenge_ttl_secs)
        .unwrap_or(0)
        .saturating_mul(1000)
}
