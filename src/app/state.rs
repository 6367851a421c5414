use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::app::config::Config;
use crate::services::{
    ClipProvider, ConnectionStore, MemoryConnectionStore, MercadoPagoClient, MercadoPagoProvider,
    ProviderRegistry, StateSigner, SupabaseConnectionStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ConnectionStore>,
    pub mercadopago: Arc<MercadoPagoClient>,
    pub providers: ProviderRegistry,
    pub state_signer: StateSigner,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;

        let store: Arc<dyn ConnectionStore> =
            match (config.supabase_url.as_deref(), config.supabase_service_key.as_deref()) {
                (Some(url), Some(key)) => {
                    Arc::new(SupabaseConnectionStore::new(client.clone(), url, key))
                }
                _ => {
                    warn!("SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY not set, connections are kept in memory");
                    Arc::new(MemoryConnectionStore::new())
                }
            };

        Ok(Self::with_store(config, client, store))
    }

    pub fn with_store(config: Config, client: Client, store: Arc<dyn ConnectionStore>) -> Self {
        let ttl = Duration::from_secs(config.oauth_state_ttl_secs);
        let state_signer = match config.oauth_state_secret.as_deref() {
            Some(secret) if !secret.is_empty() => StateSigner::new(secret.as_bytes().to_vec(), ttl),
            _ => {
                warn!("OAUTH_STATE_SECRET not set, using a per-process key");
                StateSigner::ephemeral(ttl)
            }
        };

        let mercadopago = Arc::new(MercadoPagoClient::new(client, &config.mercadopago_api_url));
        let providers = ProviderRegistry::new()
            .with(Arc::new(MercadoPagoProvider::new(mercadopago.clone())))
            .with(Arc::new(ClipProvider));

        Self {
            config: Arc::new(config),
            store,
            mercadopago,
            providers,
            state_signer,
        }
    }
}
