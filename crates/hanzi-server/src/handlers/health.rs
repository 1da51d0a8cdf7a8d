//! Liveness endpoint for monitoring.

use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

/// `GET /health`
pub async fn handler() -> Json<Value> {
  Json(json!({
    "status": "healthy",
    "timestamp": Utc::now().to_rfc3339(),
    "version": env!("CARGO_PKG_VERSION"),
  }))
}
