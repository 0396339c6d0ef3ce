use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{health, payment, webhook};
use telegram_bot::{ShopBot, WEBHOOK_PATH};

#[derive(Clone)]
pub struct ServerState {
    pub bot: Arc<ShopBot>,
    /// Public URL Telegram posts updates to, when known.
    pub webhook_url: Option<String>,
    /// Expected value of the secret token header on webhook calls.
    pub webhook_secret: Option<String>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(health::get))
        .route(WEBHOOK_PATH, post(webhook::receive))
        .route("/payment", post(payment::notify))
        .with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);
    if state.webhook_secret.is_none() {
        tracing::warn!("No webhook secret set, updates are accepted from anyone");
    }

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
