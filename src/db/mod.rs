//! # Database Module
//!
//! One submodule per table, plus the row types:
//! - `models`: data structures (User, Credential, Challenge)
//! - `users`: identity lookup and enrolment
//! - `credentials`: passkey storage and signature counter updates
//! - `challenges`: single-use ceremony challenges
//!
//! The schema lives in `migrations/` and is applied at startup.

pub mod challenges;
pub mod credentials;
pub mod models;
pub mod users;
