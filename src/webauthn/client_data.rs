//! # Client Data
//!
//! The JSON envelope the browser builds and the authenticator signs over
//! (via its SHA-256 hash). Example:
//!
//! ```json
//! {"type":"webauthn.get","challenge":"q2Fm...","origin":"https://example.com","crossOrigin":false}
//! ```
//!
//! Parsing and checking are split: [`ClientData::parse`] only validates the
//! shape, so malformed input is rejected before the stored challenge is
//! consumed; [`ClientData::verify`] then compares against server state.

use base64::prelude::*;
use serde::Deserialize;

use crate::webauthn::error::CeremonyError;

/// Which ceremony a challenge or client data envelope belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceremony {
    Registration,
    Authentication,
}

impl Ceremony {
    /// `type` value the client puts in its client data
    pub fn client_data_type(self) -> &'static str {
        match self {
            Ceremony::Registration => "webauthn.create",
            Ceremony::Authentication => "webauthn.get",
        }
    }

    /// Name stored alongside the challenge
    pub fn as_str(self) -> &'static str {
        match self {
            Ceremony::Registration => "registration",
            Ceremony::Authentication => "authentication",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub ceremony_type: String,

    /// base64url (no padding) of the challenge bytes
    pub challenge: String,

    pub origin: String,

    #[serde(default, rename = "crossOrigin")]
    pub cross_origin: bool,
}

impl ClientData {
    pub fn parse(raw: &[u8]) -> Result<Self, CeremonyError> {
        serde_json::from_slice(raw).map_err(|_| CeremonyError::MalformedClientData)
    }

    /// Check the envelope against the consumed challenge and expected origin
    ///
    /// Checks run in a fixed order: challenge, ceremony type, origin.
    pub fn verify(
        &self,
        expected_challenge: &[u8],
        ceremony: Ceremony,
        expected_origin: &str,
    ) -> Result<(), CeremonyError> {
        let challenge = BASE64_URL_SAFE_NO_PAD
            .decode(self.challenge.as_bytes())
            .map_err(|_| CeremonyError::ChallengeMismatch)?;
        if challenge != expected_challenge {
            return Err(CeremonyError::ChallengeMismatch);
        }

        if self.ceremony_type != ceremony.client_data_type() {
            return Err(CeremonyError::WrongCeremonyType);
        }

        if self.origin != expected_origin || self.cross_origin {
            return Err(CeremonyError::OriginMismatch);
        }

        Ok(())
    }
}
