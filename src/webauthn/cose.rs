//! # COSE Public Keys
//!
//! At registration the authenticator hands us its public key as a COSE_Key:
//! a CBOR map with integer labels. We support exactly one kind of key:
//!
//! | label | name | required value                 |
//! |-------|------|--------------------------------|
//! | 1     | kty  | 2 (EC2, two coordinates)       |
//! | 3     | alg  | -7 (ES256), if present         |
//! | -1    | crv  | 1 (P-256)                      |
//! | -2    | x    | 32-byte big-endian coordinate  |
//! | -3    | y    | 32-byte big-endian coordinate  |
//!
//! The key is stored as a DER SubjectPublicKeyInfo: a fixed 26-byte header
//! naming id-ecPublicKey / prime256v1, then the uncompressed SEC1 point
//! `04 || x || y`.

use crate::webauthn::cbor::Value;
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use thiserror::Error;

/// COSE algorithm identifier for ECDSA with SHA-256 on P-256
pub const ES256: i64 = -7;

const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;

const KTY_EC2: i64 = 2;
const CRV_P256: i64 = 1;

/// P-256 field element width in bytes
const COORDINATE_LEN: usize = 32;

/// SEC1 uncompressed point marker
const UNCOMPRESSED_POINT: u8 = 0x04;

/// DER header of a P-256 SubjectPublicKeyInfo, up to the BIT STRING contents
pub const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, // SEQUENCE, 89 bytes
    0x30, 0x13, // SEQUENCE, 19 bytes
    0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, // OID 1.2.840.10045.2.1
    0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, // OID 1.2.840.10045.3.1.7
    0x03, 0x42, 0x00, // BIT STRING, 66 bytes, no unused bits
];

const SPKI_LEN: usize = P256_SPKI_PREFIX.len() + 1 + 2 * COORDINATE_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("public key is not a CBOR map")]
    NotAMap,

    #[error("public key is missing {0}")]
    MissingField(&'static str),

    #[error("public key repeats label {0}")]
    DuplicateLabel(i64),

    #[error("unsupported key type")]
    UnsupportedKeyType,

    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("unsupported curve")]
    UnsupportedCurve,

    #[error("{field} coordinate is {len} bytes, expected 32")]
    CoordinateLength { field: &'static str, len: usize },

    #[error("point is not on the curve")]
    InvalidPoint,

    #[error("stored key is not a P-256 SubjectPublicKeyInfo")]
    MalformedSpki,
}

/// A P-256 public key in SubjectPublicKeyInfo DER form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    der: Vec<u8>,
}

impl PublicKey {
    /// Rebuild the key from a decoded COSE_Key map
    ///
    /// Every field is checked; nothing is defaulted or padded.
    pub fn from_cose(key: &Value) -> Result<Self, KeyError> {
        let entries = key.as_map().ok_or(KeyError::NotAMap)?;

        let mut kty = None;
        let mut alg = None;
        let mut crv = None;
        let mut x = None;
        let mut y = None;

        for (label, value) in entries {
            // Labels we don't use (e.g. key ops) are ignored, but no label
            // may appear twice.
            let Some(label) = label.as_integer() else {
                continue;
            };
            let slot = match label {
                LABEL_KTY => &mut kty,
                LABEL_ALG => &mut alg,
                LABEL_CRV => &mut crv,
                LABEL_X => &mut x,
                LABEL_Y => &mut y,
                _ => continue,
            };
            if slot.replace(value).is_some() {
                return Err(KeyError::DuplicateLabel(label));
            }
        }

        let kty = kty.ok_or(KeyError::MissingField("kty"))?;
        if kty.as_integer() != Some(KTY_EC2) {
            return Err(KeyError::UnsupportedKeyType);
        }

        if let Some(alg) = alg {
            if alg.as_integer() != Some(ES256) {
                return Err(KeyError::UnsupportedAlgorithm);
            }
        }

        let crv = crv.ok_or(KeyError::MissingField("crv"))?;
        if crv.as_integer() != Some(CRV_P256) {
            return Err(KeyError::UnsupportedCurve);
        }

        let x = coordinate(x, "x")?;
        let y = coordinate(y, "y")?;

        let mut der = Vec::with_capacity(SPKI_LEN);
        der.extend_from_slice(&P256_SPKI_PREFIX);
        der.push(UNCOMPRESSED_POINT);
        der.extend_from_slice(x);
        der.extend_from_slice(y);

        let key = Self { der };
        key.verifying_key().map_err(|_| KeyError::InvalidPoint)?;
        Ok(key)
    }

    /// Load a key previously produced by [`PublicKey::from_cose`]
    pub fn from_der(der: Vec<u8>) -> Result<Self, KeyError> {
        let key = Self { der };
        key.verifying_key()?;
        Ok(key)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Check a DER-encoded ES256 signature over `message`
    ///
    /// `message` is hashed with SHA-256 as part of verification. Raw (r || s)
    /// signatures are not accepted.
    pub fn verify(&self, message: &[u8], signature_der: &[u8]) -> bool {
        let Ok(key) = self.verifying_key() else {
            return false;
        };
        let Ok(signature) = Signature::from_der(signature_der) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }

    fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        let point = self
            .der
            .strip_prefix(&P256_SPKI_PREFIX[..])
            .filter(|point| point.len() == 1 + 2 * COORDINATE_LEN)
            .ok_or(KeyError::MalformedSpki)?;
        VerifyingKey::from_sec1_bytes(point).map_err(|_| KeyError::MalformedSpki)
    }
}

fn coordinate<'a>(value: Option<&'a Value>, field: &'static str) -> Result<&'a [u8], KeyError> {
    let bytes = value
        .ok_or(KeyError::MissingField(field))?
        .as_bytes()
        .ok_or(KeyError::MissingField(field))?;
    if bytes.len() != COORDINATE_LEN {
        return Err(KeyError::CoordinateLength {
            field,
            len: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{signature::Signer, SigningKey};

    // P-256 base point G (SEC 2, section 2.4.2)
    const GX: &str = "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";
    const GY: &str = "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

    // SubjectPublicKeyInfo for G, as printed by
    // `openssl pkey -pubin -outform DER | xxd -p`
    const G_SPKI: &str = "3059301306072a8648ce3d020106082a8648ce3d03010703420004\
                          6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296\
                          4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

    fn hex(s: &str) -> Vec<u8> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn cose_key(entries: Vec<(i64, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(label, value)| {
                    let label = if label < 0 {
                        Value::Negative(label)
                    } else {
                        Value::Unsigned(label as u64)
                    };
                    (label, value)
                })
                .collect(),
        )
    }

    fn p256_key(x: Vec<u8>, y: Vec<u8>) -> Value {
        cose_key(vec![
            (1, Value::Unsigned(2)),
            (3, Value::Negative(-7)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(x)),
            (-3, Value::Bytes(y)),
        ])
    }

    #[test]
    fn base_point_matches_published_spki() {
        let key = PublicKey::from_cose(&p256_key(hex(GX), hex(GY))).unwrap();
        assert_eq!(key.as_der(), hex(G_SPKI).as_slice());
        assert_eq!(key.as_der().len(), 91);
    }

    #[test]
    fn alg_label_is_optional() {
        let key = cose_key(vec![
            (1, Value::Unsigned(2)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(hex(GX))),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert!(PublicKey::from_cose(&key).is_ok());
    }

    #[test]
    fn rejects_wrong_coordinate_lengths() {
        let mut short = hex(GX);
        short.pop();
        assert_eq!(
            PublicKey::from_cose(&p256_key(short, hex(GY))),
            Err(KeyError::CoordinateLength { field: "x", len: 31 })
        );

        let mut long = hex(GY);
        long.insert(0, 0);
        assert_eq!(
            PublicKey::from_cose(&p256_key(hex(GX), long)),
            Err(KeyError::CoordinateLength { field: "y", len: 33 })
        );
    }

    #[test]
    fn rejects_unsupported_parameters() {
        let wrong_kty = cose_key(vec![
            (1, Value::Unsigned(3)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(hex(GX))),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert_eq!(PublicKey::from_cose(&wrong_kty), Err(KeyError::UnsupportedKeyType));

        let wrong_alg = cose_key(vec![
            (1, Value::Unsigned(2)),
            (3, Value::Negative(-257)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(hex(GX))),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert_eq!(PublicKey::from_cose(&wrong_alg), Err(KeyError::UnsupportedAlgorithm));

        let p384 = cose_key(vec![
            (1, Value::Unsigned(2)),
            (-1, Value::Unsigned(2)),
            (-2, Value::Bytes(hex(GX))),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert_eq!(PublicKey::from_cose(&p384), Err(KeyError::UnsupportedCurve));
    }

    #[test]
    fn rejects_missing_and_duplicate_fields() {
        let no_y = cose_key(vec![
            (1, Value::Unsigned(2)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(hex(GX))),
        ]);
        assert_eq!(PublicKey::from_cose(&no_y), Err(KeyError::MissingField("y")));

        let text_x = cose_key(vec![
            (1, Value::Unsigned(2)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Text("x".into())),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert_eq!(PublicKey::from_cose(&text_x), Err(KeyError::MissingField("x")));

        let twice = cose_key(vec![
            (1, Value::Unsigned(2)),
            (-1, Value::Unsigned(1)),
            (-2, Value::Bytes(hex(GX))),
            (-2, Value::Bytes(hex(GX))),
            (-3, Value::Bytes(hex(GY))),
        ]);
        assert_eq!(PublicKey::from_cose(&twice), Err(KeyError::DuplicateLabel(-2)));

        assert_eq!(PublicKey::from_cose(&Value::Unsigned(2)), Err(KeyError::NotAMap));
    }

    #[test]
    fn rejects_points_off_the_curve() {
        let mut y = hex(GY);
        y[31] ^= 1;
        assert_eq!(
            PublicKey::from_cose(&p256_key(hex(GX), y)),
            Err(KeyError::InvalidPoint)
        );
    }

    #[test]
    fn verifies_der_signatures_only() {
        let signing_key = SigningKey::from_slice(&[0x11; 32]).unwrap();
        let point = signing_key.verifying_key().to_encoded_point(false);
        let key = PublicKey::from_cose(&p256_key(
            point.x().unwrap().to_vec(),
            point.y().unwrap().to_vec(),
        ))
        .unwrap();

        let message = b"authenticator data || client data hash";
        let signature: Signature = signing_key.sign(message);

        assert!(key.verify(message, signature.to_der().as_bytes()));
        assert!(!key.verify(b"something else", signature.to_der().as_bytes()));
        assert!(!key.verify(message, &signature.to_bytes()));
    }

    #[test]
    fn round_trips_through_storage() {
        let key = PublicKey::from_cose(&p256_key(hex(GX), hex(GY))).unwrap();
        let loaded = PublicKey::from_der(key.as_der().to_vec()).unwrap();
        assert_eq!(loaded, key);

        assert_eq!(
            PublicKey::from_der(vec![0x04; 65]),
            Err(KeyError::MalformedSpki)
        );
    }
}
