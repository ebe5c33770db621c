use axum::response::Json;
use serde_json::{json, Value};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
