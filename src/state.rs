//! # Application State
//!
//! Shared resources handed to every request handler. Axum clones the state
//! for each request, which is cheap: the pool is a handle and the config is
//! behind an `Arc`.
//!
//! Nothing about an in-progress ceremony lives here. Challenges and
//! credentials are in the database, so the begin and finish requests of a
//! ceremony may land on different processes.

use crate::config::Config;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Loaded configuration (relying party hosts, challenge TTL, ...)
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect to the database and bring its schema up to date
    ///
    /// Migrations run here, once, before the server accepts any traffic.
    /// They are tracked by sqlx, so running them again is a no-op.
    ///
    /// # Errors
    /// Returns an error if the database connection or a migration fails.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = SqlitePool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(Self::with_pool(db, config.clone()))
    }

    pub fn with_pool(db: SqlitePool, config: Config) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}
