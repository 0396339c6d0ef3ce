//! Bank payment notifications

use api_types::payment::{PaymentNotification, PaymentReport};
use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{ServerError, server::ServerState};

/// Handle a transfer seen on the bank account
pub async fn notify(
    State(state): State<ServerState>,
    payload: Result<Json<PaymentNotification>, JsonRejection>,
) -> Result<Json<PaymentReport>, ServerError> {
    let Json(notification) = payload.map_err(|err| ServerError::Generic(err.body_text()))?;
    tracing::info!(
        "payment notification {} ({:?})",
        notification.code,
        notification.amount
    );

    let report = state.bot.handle_payment(notification).await?;
    Ok(Json(report))
}
