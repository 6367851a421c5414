use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::models::Device;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider responded {status}")]
    Status { status: u16, message: Option<String> },
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderError::Status { status: 401, .. })
    }
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdditionalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    pub print_on_terminal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentBody {
    /// Minor currency units.
    pub amount: i64,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPaymentIntent {
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntentPayment {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub authorization_code: Option<Value>,
    #[serde(default)]
    pub error_message: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub payment: Option<IntentPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub live_mode: bool,
}

/// Thin client for the Mercado Pago Point integration API.
pub struct MercadoPagoClient {
    client: Client,
    base_url: String,
}

impl MercadoPagoClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Caller-supplied ids go in as single escaped path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ProviderError::InvalidRequest(format!("invalid path segment {bad:?}")));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn list_devices(&self, access_token: &str) -> Result<Vec<Device>, ProviderError> {
        let response = self
            .client
            .get(self.url("/point/integration-api/devices"))
            .bearer_auth(access_token)
            .send()
            .await?;

        let list: DeviceList = check(response).await?.json().await?;
        debug!("Listed {} devices", list.devices.len());
        Ok(list.devices)
    }

    pub async fn create_payment_intent(
        &self,
        access_token: &str,
        device_id: &str,
        body: &PaymentIntentBody,
    ) -> Result<CreatedPaymentIntent, ProviderError> {
        let response = self
            .client
            .post(self.endpoint(&[
                "point",
                "integration-api",
                "devices",
                device_id,
                "payment-intents",
            ])?)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn get_payment_intent(
        &self,
        access_token: &str,
        intent_id: &str,
    ) -> Result<PaymentIntentSnapshot, ProviderError> {
        let response = self
            .client
            .get(self.endpoint(&["point", "integration-api", "payment-intents", intent_id])?)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, ProviderError> {
        let response = self
            .client
            .post(self.url("/oauth/token"))
            .json(&serde_json::json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }
}

/// Non-2xx becomes `ProviderError::Status`. The error body is read
/// best-effort; anything unparsable counts as `{}`.
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or_else(|_| Value::Object(Default::default()));
    let message = body
        .get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    warn!("Mercado Pago responded {}: {:?}", status, message);
    Err(ProviderError::Status {
        status: status.as_u16(),
        message,
    })
}
