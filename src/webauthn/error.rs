//! # Ceremony Errors
//!
//! Every way a registration or authentication ceremony can fail. Each variant
//! carries a stable machine-readable code for API clients.
//!
//! ## Categories
//! - **Client input**: missing fields, bad encodings, malformed binary data,
//!   unsupported keys. Rejected before any persisted state changes.
//! - **Ceremony integrity**: expired/mismatched challenge, wrong origin or
//!   ceremony type. The whole finish step fails.
//! - **Security fatal**: bad signature or a counter that went backwards.
//!   These may mean a credential was compromised, so they are logged
//!   separately and reported to the client as a plain authentication failure.

use crate::webauthn::cose::KeyError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CeremonyError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field is not valid base64url: {0}")]
    InvalidEncoding(&'static str),

    #[error("client data is not a valid JSON envelope")]
    MalformedClientData,

    #[error("authenticator data is malformed")]
    MalformedAuthenticatorData,

    #[error("unsupported public key: {0}")]
    UnsupportedKey(KeyError),

    #[error("no active challenge for this ceremony")]
    ChallengeExpired,

    #[error("challenge does not match")]
    ChallengeMismatch,

    #[error("wrong ceremony type")]
    WrongCeremonyType,

    #[error("origin does not match")]
    OriginMismatch,

    #[error("relying party ID hash does not match")]
    RelyingPartyMismatch,

    #[error("host is not a configured relying party")]
    UnknownRelyingParty,

    #[error("user presence was not asserted")]
    UserNotPresent,

    #[error("credential ID does not match authenticator data")]
    CredentialIdMismatch,

    #[error("credential is already registered")]
    DuplicateCredential,

    #[error("unknown identity")]
    UnknownIdentity,

    #[error("credential not found")]
    CredentialNotFound,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("signature counter did not advance")]
    PossibleCloning,
}

impl CeremonyError {
    /// Stable snake_case code returned to API clients
    pub fn code(&self) -> &'static str {
        match self {
            CeremonyError::MissingField(_) => "missing_field",
            CeremonyError::InvalidEncoding(_) => "invalid_encoding",
            CeremonyError::MalformedClientData => "malformed_client_data",
            CeremonyError::MalformedAuthenticatorData => "malformed_authenticator_data",
            CeremonyError::UnsupportedKey(_) => "unsupported_key",
            CeremonyError::ChallengeExpired => "challenge_expired",
            CeremonyError::ChallengeMismatch => "challenge_mismatch",
            CeremonyError::WrongCeremonyType => "wrong_ceremony_type",
            CeremonyError::OriginMismatch => "origin_mismatch",
            CeremonyError::RelyingPartyMismatch => "relying_party_mismatch",
            CeremonyError::UnknownRelyingParty => "unknown_relying_party",
            CeremonyError::UserNotPresent => "user_not_present",
            CeremonyError::CredentialIdMismatch => "credential_id_mismatch",
            CeremonyError::DuplicateCredential => "duplicate_credential",
            CeremonyError::UnknownIdentity => "unknown_identity",
            CeremonyError::CredentialNotFound => "credential_not_found",
            CeremonyError::InvalidSignature => "invalid_signature",
            CeremonyError::PossibleCloning => "possible_cloning",
        }
    }

    /// Failures that may indicate a compromised credential
    pub fn is_security_fatal(&self) -> bool {
        matches!(
            self,
            CeremonyError::InvalidSignature | CeremonyError::PossibleCloning
        )
    }
}

impl From<KeyError> for CeremonyError {
    fn from(e: KeyError) -> Self {
        CeremonyError::UnsupportedKey(e)
    }
}
