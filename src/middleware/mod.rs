//! # Middleware Module
//!
//! Middleware intercepts HTTP requests before they reach a handler.
//!
//! ## Our Middleware
//! - `auth`: checks that the caller has a signed-in session, plus the
//!   helpers handlers use to read and establish that session

pub mod auth;
