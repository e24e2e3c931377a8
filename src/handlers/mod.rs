//! # HTTP Request Handlers
//!
//! ## Submodules
//! - `health`: health check endpoint (for monitoring)
//! - `auth`: ceremony endpoints (register, authenticate), logout, session
//! - `users`: enrolment and the current user's profile
//!
//! ## Handler Pattern
//! Handlers are thin: extract the request (state, host, session, JSON
//! body), resolve the relying party, call into `webauthn` or `db`, and
//! return JSON. Errors are `AppError`, which renders itself.
//!
//! Request bodies are read with [`ApiJson`] rather than `axum::Json`, so a
//! body that is not JSON (or not the right shape) is answered with the
//! usual `{error, code}` body instead of axum's plain-text 422.

pub mod auth;
pub mod health;
pub mod users;

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejection is an [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
