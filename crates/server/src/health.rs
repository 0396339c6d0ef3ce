use api_types::health::Health;
use axum::{Json, extract::State};
use telegram_bot::WEBHOOK_PATH;

use crate::server::ServerState;

pub async fn get(State(state): State<ServerState>) -> Json<Health> {
    Json(Health {
        status: "running".to_string(),
        webhook_path: WEBHOOK_PATH.to_string(),
        webhook_url: state.webhook_url.clone(),
    })
}
