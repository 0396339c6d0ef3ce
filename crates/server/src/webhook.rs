//! Telegram webhook endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use telegram_bot::SECRET_TOKEN_HEADER;
use teloxide::types::Update;

use crate::server::ServerState;

/// Handle one Telegram update. Answers `OK` even when the payload cannot be
/// parsed, so Telegram does not redeliver it. Calls without the configured
/// secret token are refused.
pub async fn receive(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.webhook_secret {
        let presented = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(secret.as_str()) {
            tracing::warn!("rejected webhook call without a valid secret token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            tracing::debug!("incoming update {update:?}");
            state.bot.handle_update(update).await;
        }
        Err(err) => {
            tracing::warn!("unparseable update ({} bytes): {err}", body.len());
        }
    }
    (StatusCode::OK, "OK")
}
