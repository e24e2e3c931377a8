//! # Passkey Relying Party
//!
//! Entry point for a WebAuthn relying party server that implements the
//! passkey ceremonies itself: CBOR and COSE decoding, challenge handling,
//! ES256 signature verification and signature counters.
//!
//! ## Key Concepts
//! - **WebAuthn**: Web Authentication API for passwordless authentication
//! - **Passkeys**: WebAuthn credentials, one key pair per device and site
//! - **Relying party**: this server, identified by the host it is reached on

mod config;      // Configuration management (environment variables, settings)
mod db;          // Database operations (users, credentials, challenges)
mod error;       // Error handling and custom error types
mod handlers;    // HTTP request handlers (routes)
mod middleware;  // Request interceptors (session checks)
mod state;       // Shared application state
mod webauthn;    // Passkey ceremonies and their binary formats

#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::handlers::auth::*;
use crate::handlers::health::health_check;
use crate::handlers::users::{create_user, get_current_user};
use crate::state::AppState;
use axum::{middleware as axum_middleware, routing::{get, post}, Router};
use time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main application entry point
///
/// 1. Set up logging
/// 2. Load configuration from the environment
/// 3. Open the database and run migrations
/// 4. Configure login sessions
/// 5. Build routes and middleware
/// 6. Serve
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides; security events log on target `passkey::security`
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_relying_party=debug,passkey::security=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    // Sessions: the cookie carries only an ID, the data lives in SQLite
    let session_store = SqliteStore::new(app_state.db.clone());
    session_store.migrate().await?;

    // 24 hours of inactivity ends a login
    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    // Ceremonies are bound to the Host header, not to the request origin,
    // so CORS stays permissive for local front-ends
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that need a signed-in user
    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .route("/api/auth/register/options", post(register_options))
        .route("/api/auth/register/complete", post(register_complete))
        .layer(axum_middleware::from_fn(middleware::auth::require_auth))
        .with_state(app_state.clone());

    let app = Router::new()
        .route("/health", get(health_check))

        // Enrolment: create an identity to attach passkeys to
        .route("/api/users", post(create_user))

        // Authentication flow (logging in with a passkey)
        .route("/api/auth/authenticate/options", post(authenticate_options))    // Step 1: Get challenge
        .route("/api/auth/authenticate/complete", post(authenticate_complete))  // Step 2: Verify assertion

        // Session management
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session_info))

        .merge(protected_routes)

        // Applied in reverse order
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())

        .with_state(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
