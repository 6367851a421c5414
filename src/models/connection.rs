use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    MercadoPago,
    Clip,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::MercadoPago => "mercadopago",
            ProviderId::Clip => "clip",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mercadopago" => Ok(ProviderId::MercadoPago),
            "clip" => Ok(ProviderId::Clip),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

pub const STATUS_CONNECTED: &str = "connected";

fn default_status() -> String {
    STATUS_CONNECTED.to_string()
}

/// A merchant's stored authorization with one payment provider.
///
/// Unique on `(user_id, provider)`. Rows live in the `terminal_connections`
/// table and are never hard-deleted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConnection {
    pub user_id: String,
    pub provider: ProviderId,
    pub provider_user_id: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub live_mode: bool,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub selected_device_id: Option<String>,
    #[serde(default)]
    pub selected_device_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TerminalConnection {
    pub fn new(
        user_id: impl Into<String>,
        provider: ProviderId,
        access_token: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider,
            provider_user_id: None,
            access_token: access_token.into(),
            refresh_token: None,
            public_key: None,
            token_expires_at: None,
            live_mode: false,
            status: default_status(),
            selected_device_id: None,
            selected_device_name: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for TerminalConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalConnection")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("provider_user_id", &self.provider_user_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_expires_at", &self.token_expires_at)
            .field("live_mode", &self.live_mode)
            .field("status", &self.status)
            .field("selected_device_id", &self.selected_device_id)
            .field("selected_device_name", &self.selected_device_name)
            .finish()
    }
}
