use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::app::error::{ApiError, PaymentApiError};
use crate::app::state::AppState;
use crate::handlers::payment_intent::resolve_provider;
use crate::handlers::upstream_error;
use crate::services::providers::IntentSnapshot;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    provider: Option<String>,
    payment_intent_id: Option<String>,
    access_token: Option<String>,
}

/// Each poll re-derives the status from the provider's current snapshot.
/// Nothing is kept between polls, so a status can move backwards if the
/// provider does.
pub async fn get_payment_status(
    State(state): State<AppState>,
    payload: Result<Json<PaymentStatusRequest>, JsonRejection>,
) -> Result<Json<IntentSnapshot>, PaymentApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(provider), Some(intent_id), Some(access_token)) = (
        non_empty(request.provider),
        non_empty(request.payment_intent_id),
        non_empty(request.access_token),
    ) else {
        return Err(ApiError::missing_fields(&["provider", "paymentIntentId", "accessToken"]).into());
    };

    let provider = resolve_provider(&state, &provider)?;
    let snapshot = provider
        .get_status(&intent_id, &access_token)
        .await
        .map_err(|e| {
            error!(provider = %provider.id(), payment_intent_id = %intent_id, "Status check failed: {}", e);
            upstream_error(e)
        })?;

    debug!(
        provider = %provider.id(),
        payment_intent_id = %intent_id,
        status = snapshot.status.as_str(),
        terminal = snapshot.status.is_terminal(),
        "Polled payment intent"
    );
    Ok(Json(snapshot))
}
