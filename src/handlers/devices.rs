use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::auth::AuthUser;
use crate::app::error::ApiError;
use crate::app::state::AppState;
use crate::handlers::upstream_error;
use crate::models::{Device, ProviderId};
use crate::services::ProviderError;

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDeviceRequest {
    device_id: Option<String>,
    device_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDeviceResponse {
    pub success: bool,
    pub device_id: String,
    pub device_name: String,
}

pub async fn list_devices(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DevicesResponse>, ApiError> {
    let connection = state
        .store
        .find(&user.user_id, ProviderId::MercadoPago)
        .await?
        .ok_or(ApiError::NoActiveConnection)?;

    // No refresh-token exchange here; the client reconnects instead.
    let devices = state
        .mercadopago
        .list_devices(&connection.access_token)
        .await
        .map_err(|err| match err {
            err if err.is_unauthorized() => {
                warn!(user_id = %user.user_id, "Mercado Pago token rejected");
                ApiError::TokenExpired
            }
            ProviderError::Status { message, .. } => ApiError::Upstream {
                status: 500,
                message,
            },
            err => upstream_error(err),
        })?;

    info!(user_id = %user.user_id, "Found {} terminals", devices.len());
    let count = devices.len();
    Ok(Json(DevicesResponse { devices, count }))
}

pub async fn select_device(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<SelectDeviceRequest>, JsonRejection>,
) -> Result<Json<SelectDeviceResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;

    let device_id = request
        .device_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("deviceId is required".to_string()))?;
    let device_name = request
        .device_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("Terminal {device_id}"));

    let affected = state
        .store
        .select_device(
            &user.user_id,
            ProviderId::MercadoPago,
            &device_id,
            &device_name,
            Utc::now(),
        )
        .await?;
    if affected == 0 {
        return Err(ApiError::NoActiveConnection);
    }

    info!(user_id = %user.user_id, %device_id, "Selected terminal");
    Ok(Json(SelectDeviceResponse {
        success: true,
        device_id,
        device_name,
    }))
}
