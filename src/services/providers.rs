use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::models::{map_point_state, IntentStatus, ProviderId};
use crate::services::mercadopago::{
    AdditionalInfo, MercadoPagoClient, PaymentIntentBody, ProviderError,
};
use crate::utils::money::{format_currency, to_minor_units};

#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub device_id: String,
    pub access_token: String,
    /// Major units.
    pub amount: Decimal,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIntent {
    pub status: IntentStatus,
    pub payment_intent_id: String,
    pub device_id: String,
    /// Whatever amount the provider echoed back.
    pub amount: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSnapshot {
    pub status: IntentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, ProviderError>;

    async fn get_status(
        &self,
        intent_id: &str,
        access_token: &str,
    ) -> Result<IntentSnapshot, ProviderError>;
}

pub struct MercadoPagoProvider {
    client: Arc<MercadoPagoClient>,
}

impl MercadoPagoProvider {
    pub fn new(client: Arc<MercadoPagoClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentProvider for MercadoPagoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::MercadoPago
    }

    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, ProviderError> {
        let amount = to_minor_units(request.amount).ok_or_else(|| {
            ProviderError::InvalidRequest(format!("amount {} has no minor-unit form", request.amount))
        })?;
        let body = PaymentIntentBody {
            amount,
            additional_info: AdditionalInfo {
                external_reference: request.external_reference.clone(),
                print_on_terminal: true,
            },
        };

        info!(
            device_id = %request.device_id,
            amount = %format_currency(request.amount),
            "Creating Mercado Pago payment intent"
        );
        let created = self
            .client
            .create_payment_intent(&request.access_token, &request.device_id, &body)
            .await?;

        Ok(CreatedIntent {
            status: IntentStatus::Processing,
            payment_intent_id: created.id,
            device_id: created.device_id.unwrap_or_else(|| request.device_id.clone()),
            amount: created.amount,
        })
    }

    async fn get_status(
        &self,
        intent_id: &str,
        access_token: &str,
    ) -> Result<IntentSnapshot, ProviderError> {
        let snapshot = self.client.get_payment_intent(access_token, intent_id).await?;
        let payment = snapshot.payment.unwrap_or_default();
        let status = map_point_state(snapshot.state.as_deref(), payment.state.as_deref());

        Ok(IntentSnapshot {
            status,
            payment_id: payment.id,
            authorization_code: payment.authorization_code,
            error_message: payment.error_message,
            raw_state: snapshot.state,
            message: None,
        })
    }
}

const CLIP_STUB_MESSAGE: &str = "Clip terminal status is not available yet; confirm the charge on the device";

/// Clip has no real integration: nothing here performs I/O.
#[derive(Debug, Default)]
pub struct ClipProvider;

#[async_trait]
impl PaymentProvider for ClipProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Clip
    }

    async fn create_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, ProviderError> {
        Ok(CreatedIntent {
            status: IntentStatus::Processing,
            payment_intent_id: format!("clip_{}", Utc::now().timestamp_millis()),
            device_id: request.device_id.clone(),
            amount: request
                .amount
                .to_f64()
                .map(Value::from)
                .unwrap_or(Value::Null),
        })
    }

    async fn get_status(
        &self,
        _intent_id: &str,
        _access_token: &str,
    ) -> Result<IntentSnapshot, ProviderError> {
        Ok(IntentSnapshot {
            status: IntentStatus::Processing,
            payment_id: None,
            authorization_code: None,
            error_message: None,
            raw_state: None,
            message: Some(CLIP_STUB_MESSAGE.to_string()),
        })
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(&id).cloned()
    }
}
