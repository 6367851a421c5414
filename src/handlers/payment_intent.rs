use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::app::error::{ApiError, PaymentApiError};
use crate::app::state::AppState;
use crate::handlers::upstream_error;
use crate::models::ProviderId;
use crate::services::providers::{CreatedIntent, IntentRequest};
use crate::services::PaymentProvider;
use crate::utils::money::{parse_amount, to_minor_units};

/// The caller sends the provider access token itself; this route does not
/// read the credential store.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    provider: Option<String>,
    device_id: Option<String>,
    access_token: Option<String>,
    amount: Option<Value>,
    external_reference: Option<String>,
    intent_id: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn resolve_provider(
    state: &AppState,
    raw: &str,
) -> Result<Arc<dyn PaymentProvider>, ApiError> {
    raw.parse::<ProviderId>()
        .ok()
        .and_then(|id| state.providers.get(id))
        .ok_or_else(|| ApiError::UnsupportedProvider(raw.to_string()))
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreateIntentRequest>, JsonRejection>,
) -> Result<Json<CreatedIntent>, PaymentApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let provider = present(request.provider);
    let device_id = present(request.device_id);
    let access_token = present(request.access_token);
    let amount = request.amount.filter(|v| !v.is_null());

    let (Some(provider), Some(device_id), Some(access_token), Some(amount)) =
        (provider.as_deref(), device_id, access_token, amount)
    else {
        return Err(ApiError::missing_fields(&["provider", "deviceId", "accessToken", "amount"]).into());
    };
    let amount = parse_amount(&amount)
        .filter(|a| to_minor_units(*a).is_some())
        .ok_or_else(|| ApiError::InvalidInput("amount must be a positive number".to_string()))?;

    let provider = resolve_provider(&state, provider)?;
    let intent = IntentRequest {
        device_id,
        access_token,
        amount,
        external_reference: present(request.external_reference).or(present(request.intent_id)),
    };

    let created = provider.create_intent(&intent).await.map_err(|e| {
        error!(provider = %provider.id(), device_id = %intent.device_id, "Payment intent failed: {}", e);
        upstream_error(e)
    })?;

    info!(
        provider = %provider.id(),
        payment_intent_id = %created.payment_intent_id,
        "Payment intent sent to terminal"
    );
    Ok(Json(created))
}
