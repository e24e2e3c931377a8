//! # Relying Party
//!
//! The RP ID and expected origin are derived from the `Host` the request was
//! served on, never from anything in the request body. The host must be one
//! of the configured `RP_HOSTS`; otherwise a client could point a ceremony
//! at an RP ID of its choosing by sending a forged `Host` header.

use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::webauthn::error::CeremonyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Hostname without port, e.g. "example.com"
    pub id: String,
    /// Exact origin the client data must carry, e.g. "https://example.com"
    pub origin: String,
    /// Display name shown by the authenticator
    pub name: String,
}

impl RelyingParty {
    /// Resolve the relying party for a request's `Host` header value
    pub fn from_host(config: &Config, host: &str) -> Result<Self, CeremonyError> {
        let authority = host.trim().to_ascii_lowercase();
        let id = hostname(&authority);

        if id.is_empty() || !config.rp_hosts.iter().any(|allowed| allowed == id) {
            tracing::debug!(host = %authority, "request for unconfigured relying party host");
            return Err(CeremonyError::UnknownRelyingParty);
        }

        Ok(Self {
            id: id.to_string(),
            origin: format!("https://{authority}"),
            name: config.rp_name.clone(),
        })
    }

    /// SHA-256 of the RP ID, as found at the start of authenticator data
    pub fn id_hash(&self) -> [u8; 32] {
        Sha256::digest(self.id.as_bytes()).into()
    }
}

/// Strip a trailing `:port` from an authority
fn hostname(authority: &str) -> &str {
    match authority.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[test]
    fn derives_id_and_origin_from_host() {
        let config = test_config();

        let rp = RelyingParty::from_host(&config, "Example.COM").unwrap();
        assert_eq!(rp.id, "example.com");
        assert_eq!(rp.origin, "https://example.com");
        assert_eq!(rp.name, config.rp_name);

        let rp = RelyingParty::from_host(&config, "localhost:8080").unwrap();
        assert_eq!(rp.id, "localhost");
        assert_eq!(rp.origin, "https://localhost:8080");
    }

    #[test]
    fn rejects_hosts_outside_allowlist() {
        let config = test_config();
        for host in ["evil.com", "example.com.evil.com", "", ":443", "[::1]:8080"] {
            assert_eq!(
                RelyingParty::from_host(&config, host),
                Err(CeremonyError::UnknownRelyingParty),
                "{host}"
            );
        }
    }

    #[test]
    fn id_hash_is_sha256_of_id() {
        let rp = RelyingParty::from_host(&test_config(), "example.com").unwrap();
        assert_eq!(rp.id_hash(), <[u8; 32]>::from(Sha256::digest(b"example.com")));
    }
}
