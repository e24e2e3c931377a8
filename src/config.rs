//! # Configuration Management
//!
//! Configuration comes from environment variables (12-factor style), with a
//! `.env` file loaded first for local development.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite database connection string
//! - `RP_NAME`: Human-readable name for your service
//! - `RP_HOSTS`: Comma-separated hostnames this server may act as relying
//!   party for (default: localhost)
//! - `CHALLENGE_TTL_SECS`: How long a ceremony challenge stays valid
//!   (default: 300, at most 3600)

use anyhow::{bail, Result};
use std::env;

/// Application configuration
///
/// ## Relying party identity
/// Unlike a fixed `RP_ID`, the relying party ID is worked out per request
/// from the `Host` header and must appear in `rp_hosts`. The expected
/// origin is always `https://` plus that host.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number (1-65535)
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc" (read, write, create)
    pub database_url: String,

    /// Name shown to users during passkey creation
    pub rp_name: String,

    /// Lower-cased hostnames (no port) accepted as relying party IDs
    pub rp_hosts: Vec<String>,

    /// Lifetime of a registration or authentication challenge, in seconds
    pub challenge_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// DATABASE_URL=sqlite:passkey.db?mode=rwc
    /// RP_NAME=Passkey Demo
    /// RP_HOSTS=localhost,example.com
    /// CHALLENGE_TTL_SECS=300
    /// ```
    pub fn from_env() -> Result<Self> {
        // dotenvy doesn't error if the file is missing
        dotenvy::dotenv().ok();

        let rp_hosts = parse_hosts(&env::var("RP_HOSTS").unwrap_or_else(|_| "localhost".to_string()));
        if rp_hosts.is_empty() {
            bail!("RP_HOSTS must list at least one hostname");
        }

        let challenge_ttl_secs =
            parse_challenge_ttl(&env::var("CHALLENGE_TTL_SECS").unwrap_or_else(|_| "300".to_string()))?;

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:passkey.db?mode=rwc".to_string()),

            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Passkey Demo".to_string()),

            rp_hosts,
            challenge_ttl_secs,
        })
    }

    /// Socket address for `tokio::net::TcpListener::bind()`, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn challenge_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.challenge_ttl_secs)
    }
}

/// Longest challenge lifetime accepted from the environment
const MAX_CHALLENGE_TTL_SECS: i64 = 3600;

fn parse_challenge_ttl(raw: &str) -> Result<i64> {
    let secs: i64 = raw.trim().parse()?;
    if !(1..=MAX_CHALLENGE_TTL_SECS).contains(&secs) {
        bail!("CHALLENGE_TTL_SECS must be between 1 and {MAX_CHALLENGE_TTL_SECS}, got {secs}");
    }
    Ok(secs)
}

fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}
