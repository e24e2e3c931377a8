//! # Health Check Handler
//!
//! Liveness endpoint for load balancers and monitoring.

use axum::Json;
use serde_json::{json, Value};

/// GET /health
///
/// ```json
/// { "status": "healthy", "service": "passkey-relying-party" }
/// ```
///
/// Never fails, so it returns `Json<Value>` rather than `AppResult`.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "passkey-relying-party"
    }))
}
