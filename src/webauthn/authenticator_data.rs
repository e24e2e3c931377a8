//! # Authenticator Data
//!
//! The binary envelope produced by the authenticator itself:
//!
//! ```text
//! rpIdHash (32) | flags (1) | signCount (4, BE) | [attested credential] | [extensions]
//!
//! attested credential (registration only, AT flag):
//!   aaguid (16) | credentialIdLength (2, BE) | credentialId (L) | COSE_Key (CBOR)
//! ```
//!
//! Extensions, when the ED flag is set, are a trailing CBOR map. We decode
//! it only to find where the buffer ends; its contents are ignored. No bytes
//! may follow.

use crate::webauthn::cbor::{self, Value};
use crate::webauthn::error::CeremonyError;
use crate::webauthn::reader::{ByteReader, OutOfBounds};

pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;
pub const FLAG_EXTENSIONS: u8 = 0x80;

/// Longest credential ID an authenticator may return
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// Credential block present in registration output
#[derive(Debug, Clone)]
pub struct AttestedCredential {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub public_key: Value,
}

#[derive(Debug, Clone)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredential>,
}

impl AuthenticatorData {
    /// Parse registration output; the attested credential block is required
    pub fn parse_registration(bytes: &[u8]) -> Result<Self, CeremonyError> {
        let data = Self::parse(bytes)?;
        if data.attested_credential.is_none() {
            return Err(CeremonyError::MalformedAuthenticatorData);
        }
        Ok(data)
    }

    /// Parse assertion output; an attested credential block is not allowed
    pub fn parse_assertion(bytes: &[u8]) -> Result<Self, CeremonyError> {
        let data = Self::parse(bytes)?;
        if data.attested_credential.is_some() {
            return Err(CeremonyError::MalformedAuthenticatorData);
        }
        Ok(data)
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }

    fn parse(bytes: &[u8]) -> Result<Self, CeremonyError> {
        let malformed = |_: OutOfBounds| CeremonyError::MalformedAuthenticatorData;
        let mut reader = ByteReader::new(bytes);

        let rp_id_hash = reader.read_array::<32>().map_err(malformed)?;
        let flags = reader.read_u8().map_err(malformed)?;
        let sign_count = reader.read_u32_be().map_err(malformed)?;

        let attested_credential = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            Some(parse_attested_credential(&mut reader)?)
        } else {
            None
        };

        if flags & FLAG_EXTENSIONS != 0 {
            match cbor::decode_from(&mut reader) {
                Ok(Value::Map(_)) => {}
                _ => return Err(CeremonyError::MalformedAuthenticatorData),
            }
        }

        if !reader.is_empty() {
            return Err(CeremonyError::MalformedAuthenticatorData);
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }
}

fn parse_attested_credential(
    reader: &mut ByteReader<'_>,
) -> Result<AttestedCredential, CeremonyError> {
    let malformed = |_: OutOfBounds| CeremonyError::MalformedAuthenticatorData;

    let aaguid = reader.read_array::<16>().map_err(malformed)?;
    let id_len = usize::from(reader.read_u16_be().map_err(malformed)?);
    if id_len == 0 || id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(CeremonyError::MalformedAuthenticatorData);
    }
    let credential_id = reader.take(id_len).map_err(malformed)?.to_vec();
    let public_key =
        cbor::decode_from(reader).map_err(|_| CeremonyError::MalformedAuthenticatorData)?;

    Ok(AttestedCredential {
        aaguid,
        credential_id,
        public_key,
    })
}
