use clap::Parser;

pub const CALLBACK_PATH: &str = "/api/oauth/mercadopago/callback";

#[derive(Debug, Clone, Parser)]
#[command(name = "pos-terminals", about = "Card terminal integration API")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 9999)]
    pub server_port: u16,

    #[arg(long, env = "MERCADOPAGO_CLIENT_ID")]
    pub mercadopago_client_id: Option<String>,

    #[arg(long, env = "MERCADOPAGO_CLIENT_SECRET", hide_env_values = true)]
    pub mercadopago_client_secret: Option<String>,

    /// Explicit OAuth redirect URI; wins over anything derived.
    #[arg(long, env = "MERCADOPAGO_REDIRECT_URI")]
    pub mercadopago_redirect_uri: Option<String>,

    #[arg(long, env = "MERCADOPAGO_API_URL", default_value = "https://api.mercadopago.com")]
    pub mercadopago_api_url: String,

    #[arg(long, env = "MERCADOPAGO_AUTH_URL", default_value = "https://auth.mercadopago.com")]
    pub mercadopago_auth_url: String,

    #[arg(long, env = "MERCADOPAGO_PLATFORM_ID", default_value = "mp")]
    pub mercadopago_platform_id: String,

    /// Public origin of the web application, e.g. `https://pos.example.com`.
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Honour `X-Forwarded-Host`/`X-Forwarded-Proto` when deriving the
    /// request origin. Only enable behind a proxy that overwrites them.
    #[arg(long, env = "TRUST_FORWARDED_HEADERS", default_value_t = false)]
    pub trust_forwarded_headers: bool,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,

    #[arg(long, env = "SUPABASE_JWT_SECRET", hide_env_values = true)]
    pub supabase_jwt_secret: Option<String>,

    #[arg(long, env = "OAUTH_STATE_SECRET", hide_env_values = true)]
    pub oauth_state_secret: Option<String>,

    #[arg(long, env = "OAUTH_STATE_TTL_SECS", default_value_t = 600)]
    pub oauth_state_ttl_secs: u64,

    #[arg(long, env = "HTTP_TIMEOUT_MS", default_value_t = 10_000)]
    pub http_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::parse()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.server_port)
    }

    /// No client id means the OAuth flow runs in demo mode.
    pub fn demo_mode(&self) -> bool {
        self.mercadopago_client_id
            .as_deref()
            .map_or(true, |id| id.trim().is_empty())
    }

    /// Precedence: explicit override, then the public base URL, then the
    /// origin of the incoming request.
    pub fn redirect_uri(&self, request_origin: &str) -> String {
        if let Some(uri) = self.mercadopago_redirect_uri.as_deref() {
            return uri.to_string();
        }
        format!("{}{}", self.app_origin(request_origin), CALLBACK_PATH)
    }

    pub fn app_origin(&self, request_origin: &str) -> String {
        let origin = self
            .public_base_url
            .as_deref()
            .unwrap_or(request_origin);
        origin.trim_end_matches('/').to_string()
    }
}
