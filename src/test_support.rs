//! Shared fixtures for unit tests: an in-memory database with the real
//! migrations, and a software authenticator that produces genuine ES256
//! registration and assertion output.

use base64::prelude::*;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePoolOptions;

use crate::config::Config;
use crate::db::{models::User, users};
use crate::state::AppState;
use crate::webauthn::authenticator_data::{FLAG_ATTESTED_CREDENTIAL, FLAG_USER_PRESENT, FLAG_USER_VERIFIED};
use crate::webauthn::cbor::Value;
use crate::webauthn::relying_party::RelyingParty;
use crate::webauthn::types::{AuthenticationFinishRequest, RegistrationFinishRequest};

pub const TEST_HOST: &str = "example.com";

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        rp_name: "Example".to_string(),
        rp_hosts: vec!["example.com".to_string(), "localhost".to_string()],
        challenge_ttl_secs: 300,
    }
}

/// Fresh state backed by a private in-memory database
pub async fn test_state() -> AppState {
    // One connection that never closes: each in-memory connection is its own
    // database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    AppState::with_pool(pool, test_config())
}

pub fn test_rp() -> RelyingParty {
    RelyingParty::from_host(&test_config(), TEST_HOST).expect("test host is allowed")
}

pub async fn create_test_user(state: &AppState, handle: &str) -> User {
    users::create_user(&state.db, handle, "Test User")
        .await
        .expect("create user")
}

pub fn b64(bytes: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

pub fn client_data_json(ceremony_type: &str, challenge: &str, origin: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": ceremony_type,
        "challenge": challenge,
        "origin": origin,
        "crossOrigin": false,
    }))
    .expect("serialize client data")
}

/// A P-256 authenticator living in memory
pub struct SoftAuthenticator {
    signing_key: SigningKey,
    pub credential_id: Vec<u8>,
}

impl SoftAuthenticator {
    pub fn new(credential_id: &[u8]) -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
            credential_id: credential_id.to_vec(),
        }
    }

    pub fn cose_key(&self) -> Value {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        Value::Map(vec![
            (Value::Unsigned(1), Value::Unsigned(2)),
            (Value::Unsigned(3), Value::Negative(-7)),
            (Value::Negative(-1), Value::Unsigned(1)),
            (Value::Negative(-2), Value::Bytes(point.x().expect("x").to_vec())),
            (Value::Negative(-3), Value::Bytes(point.y().expect("y").to_vec())),
        ])
    }

    /// Uncompressed SEC1 point, for comparing with what the server stored
    pub fn public_point(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Registration authenticator data carrying `key`
    pub fn registration_data_with_key(&self, rp_id: &str, key: &Value) -> Vec<u8> {
        let mut out = header(rp_id, FLAG_USER_PRESENT | FLAG_USER_VERIFIED | FLAG_ATTESTED_CREDENTIAL, 0);
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend(key.encode());
        out
    }

    pub fn registration_data(&self, rp_id: &str) -> Vec<u8> {
        self.registration_data_with_key(rp_id, &self.cose_key())
    }

    /// A well-formed `register/complete` body for the given challenge
    pub fn register(&self, rp: &RelyingParty, challenge: &str) -> RegistrationFinishRequest {
        RegistrationFinishRequest {
            credential_id: Some(b64(&self.credential_id)),
            authenticator_data: Some(b64(&self.registration_data(&rp.id))),
            client_data: Some(b64(&client_data_json("webauthn.create", challenge, &rp.origin))),
        }
    }

    pub fn assertion_data(&self, rp_id: &str, sign_count: u32) -> Vec<u8> {
        header(rp_id, FLAG_USER_PRESENT | FLAG_USER_VERIFIED, sign_count)
    }

    /// DER signature over `authenticator_data || SHA-256(client_data)`
    pub fn sign(&self, authenticator_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut message = authenticator_data.to_vec();
        message.extend_from_slice(&Sha256::digest(client_data));
        let signature: Signature = self.signing_key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }

    /// A validly signed `authenticate/complete` body
    pub fn assert(
        &self,
        rp: &RelyingParty,
        handle: &str,
        challenge: &str,
        sign_count: u32,
    ) -> AuthenticationFinishRequest {
        let authenticator_data = self.assertion_data(&rp.id, sign_count);
        let client_data = client_data_json("webauthn.get", challenge, &rp.origin);
        self.assertion_request(handle, &authenticator_data, &client_data)
    }

    /// Sign arbitrary blobs and package them as a request
    pub fn assertion_request(
        &self,
        handle: &str,
        authenticator_data: &[u8],
        client_data: &[u8],
    ) -> AuthenticationFinishRequest {
        let signature = self.sign(authenticator_data, client_data);
        AuthenticationFinishRequest {
            identity_handle: Some(handle.to_string()),
            credential_id: Some(b64(&self.credential_id)),
            authenticator_data: Some(b64(authenticator_data)),
            client_data: Some(b64(client_data)),
            signature: Some(b64(&signature)),
        }
    }
}

fn header(rp_id: &str, flags: u8, sign_count: u32) -> Vec<u8> {
    let mut out = Sha256::digest(rp_id.as_bytes()).to_vec();
    out.push(flags);
    out.extend_from_slice(&sign_count.to_be_bytes());
    out
}
