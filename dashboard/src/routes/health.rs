use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true, "service": "csv-dashboard" }))
}

pub async fn health() -> &'static str {
    "OK"
}
