use crate::gateway::Gateway;
use axum::routing::get;
use axum::{Extension, Json};
use chrono::Utc;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new().route("/health", get(get_health))
}

#[tracing::instrument(level = "debug", skip_all)]
async fn get_health(Extension(gateway): Extension<Arc<Gateway>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "active_conversations": gateway.active_conversations(),
        "connected_clients": gateway.connected_clients(),
        "checked_at": Utc::now(),
    }))
}
