use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Json, Redirect},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::app::auth::AuthUser;
use crate::app::error::ApiError;
use crate::app::state::AppState;
use crate::handlers::{request_origin, upstream_error};
use crate::models::{ProviderId, TerminalConnection};
use crate::services::OAuthState;

const NOT_CONFIGURED_MESSAGE: &str =
    "Mercado Pago is not configured. Set MERCADOPAGO_CLIENT_ID to enable terminal payments.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Only Mercado Pago offers an OAuth connect flow.
fn oauth_provider(raw: &str) -> Result<ProviderId, ApiError> {
    match raw.parse::<ProviderId>() {
        Ok(ProviderId::MercadoPago) => Ok(ProviderId::MercadoPago),
        _ => Err(ApiError::UnsupportedProvider(raw.to_string())),
    }
}

pub async fn connect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<Json<ConnectResponse>, ApiError> {
    let provider = oauth_provider(&provider)?;
    let config = &state.config;

    let client_id = match config.mercadopago_client_id.as_deref() {
        Some(id) if !config.demo_mode() => id,
        _ => {
            warn!("OAuth connect requested but {} is not configured", provider);
            return Err(ApiError::NotConfigured {
                message: NOT_CONFIGURED_MESSAGE.to_string(),
            });
        }
    };

    let origin = request_origin(&headers, config.trust_forwarded_headers);
    let redirect_uri = config.redirect_uri(&origin);
    let oauth_state = state
        .state_signer
        .sign(&OAuthState::new(&user.user_id, Utc::now()));

    let auth_url = Url::parse_with_params(
        &format!("{}/authorization", config.mercadopago_auth_url.trim_end_matches('/')),
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("platform_id", config.mercadopago_platform_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("state", oauth_state.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("invalid authorization url: {e}")))?;

    info!(user_id = %user.user_id, %provider, "Built OAuth authorization url");
    Ok(Json(ConnectResponse {
        auth_url: auth_url.into(),
        state: oauth_state,
    }))
}

/// Provider redirect target. The signed state identifies the user, since
/// the browser redirect carries no bearer token.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let provider = oauth_provider(&provider)?;

    if let Some(error) = query.error {
        return Err(ApiError::InvalidInput(format!("Authorization denied: {error}")));
    }
    let (Some(code), Some(raw_state)) = (query.code, query.state) else {
        return Err(ApiError::missing_fields(&["code", "state"]));
    };

    let now = Utc::now();
    let oauth_state = state.state_signer.verify(&raw_state, now)?;

    let config = &state.config;
    let (Some(client_id), Some(client_secret)) = (
        config.mercadopago_client_id.as_deref(),
        config.mercadopago_client_secret.as_deref(),
    ) else {
        return Err(ApiError::NotConfigured {
            message: NOT_CONFIGURED_MESSAGE.to_string(),
        });
    };

    let origin = request_origin(&headers, config.trust_forwarded_headers);
    let grant = state
        .mercadopago
        .exchange_code(client_id, client_secret, &code, &config.redirect_uri(&origin))
        .await
        .map_err(upstream_error)?;

    let existing = state.store.find(&oauth_state.user_id, provider).await?;

    let mut connection =
        TerminalConnection::new(&oauth_state.user_id, provider, grant.access_token, now);
    connection.provider_user_id = grant.user_id.map(|id| match id {
        Value::String(s) => s,
        other => other.to_string(),
    });
    connection.refresh_token = grant.refresh_token;
    connection.public_key = grant.public_key;
    connection.live_mode = grant.live_mode;
    connection.token_expires_at = grant.expires_in.map(|secs| now + Duration::seconds(secs));
    if let Some(existing) = existing {
        connection.created_at = existing.created_at;
        connection.selected_device_id = existing.selected_device_id;
        connection.selected_device_name = existing.selected_device_name;
    }

    state.store.upsert(connection).await?;
    info!(user_id = %oauth_state.user_id, %provider, "Stored terminal connection");

    Ok(Redirect::to(&format!(
        "{}/dashboard/terminals?connected={}",
        config.app_origin(&origin),
        provider
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ConnectionStore;
    use crate::test_support::{get, send, test_config, test_state};
    use axum::http::{header, HeaderValue, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn connect_requires_authentication() {
        let (state, _) = test_state(test_config("http://mp.invalid"));
        let (status, body) = send(crate::router(state), get("/api/oauth/mercadopago/connect", None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn connect_reports_demo_mode_without_client_id() {
        let mut config = test_config("http://mp.invalid");
        config.mercadopago_client_id = None;
        let (state, _) = test_state(config);

        let (status, body) =
            send(crate::router(state), get("/api/oauth/mercadopago/connect", Some("u1"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["demo_mode"], json!(true));
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn connect_builds_authorization_url() {
        let (state, _) = test_state(test_config("http://mp.invalid"));
        let signer = state.state_signer.clone();

        let (status, body) =
            send(crate::router(state), get("/api/oauth/mercadopago/connect", Some("u1"))).await;
        assert_eq!(status, StatusCode::OK);

        let auth_url = Url::parse(body["authUrl"].as_str().unwrap()).unwrap();
        assert_eq!(auth_url.host_str(), Some("auth.mercadopago.test"));
        assert_eq!(auth_url.path(), "/authorization");

        let params: std::collections::HashMap<_, _> = auth_url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["platform_id"], "mp");
        assert_eq!(
            params["redirect_uri"],
            "http://pos.local/api/oauth/mercadopago/callback"
        );
        assert_eq!(params["state"], body["state"].as_str().unwrap());

        let decoded = signer.verify(&params["state"], Utc::now()).unwrap();
        assert_eq!(decoded.user_id, "u1");
    }

    #[tokio::test]
    async fn connect_ignores_forwarded_host_unless_trusted() {
        let redirect_for = |trust: bool| async move {
            let mut config = test_config("http://mp.invalid");
            config.trust_forwarded_headers = trust;
            let (state, _) = test_state(config);

            let mut request = get("/api/oauth/mercadopago/connect", Some("u1"));
            request
                .headers_mut()
                .insert("x-forwarded-host", HeaderValue::from_static("evil.example.com"));
            request
                .headers_mut()
                .insert("x-forwarded-proto", HeaderValue::from_static("https"));

            let (status, body) = send(crate::router(state), request).await;
            assert_eq!(status, StatusCode::OK);
            let auth_url = Url::parse(body["authUrl"].as_str().unwrap()).unwrap();
            auth_url
                .query_pairs()
                .find(|(k, _)| k == "redirect_uri")
                .map(|(_, v)| v.into_owned())
                .unwrap()
        };

        assert_eq!(
            redirect_for(false).await,
            "http://pos.local/api/oauth/mercadopago/callback"
        );
        assert_eq!(
            redirect_for(true).await,
            "https://evil.example.com/api/oauth/mercadopago/callback"
        );
    }

    #[tokio::test]
    async fn connect_rejects_providers_without_oauth() {
        let (state, _) = test_state(test_config("http://mp.invalid"));
        let (status, _) = send(crate::router(state), get("/api/oauth/clip/connect", Some("u1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_exchanges_code_and_stores_connection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_partial_json(json!({
                "client_id": "client-123",
                "client_secret": "secret-456",
                "grant_type": "authorization_code",
                "code": "TG-code"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "APP_USR-access",
                "refresh_token": "TG-refresh",
                "public_key": "APP_USR-public",
                "user_id": 998877,
                "expires_in": 15552000,
                "live_mode": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (state, store) = test_state(test_config(&server.uri()));
        let now = Utc::now();
        let mut previous = TerminalConnection::new("u1", ProviderId::MercadoPago, "old", now);
        previous.selected_device_id = Some("D1".into());
        store.upsert(previous).await.unwrap();

        let oauth_state = state.state_signer.sign(&OAuthState::new("u1", now));
        let uri = format!("/api/oauth/mercadopago/callback?code=TG-code&state={oauth_state}");
        let response = crate::router(state).oneshot(get(&uri, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://pos.local/dashboard/terminals?connected=mercadopago"
        );

        let stored = store.find("u1", ProviderId::MercadoPago).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "APP_USR-access");
        assert_eq!(stored.refresh_token.as_deref(), Some("TG-refresh"));
        assert_eq!(stored.provider_user_id.as_deref(), Some("998877"));
        assert!(stored.live_mode);
        assert!(stored.token_expires_at.is_some());
        assert_eq!(stored.selected_device_id.as_deref(), Some("D1"));
    }

    #[tokio::test]
    async fn callback_rejects_forged_state_without_calling_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (state, store) = test_state(test_config(&server.uri()));
        let (status, _) = send(
            crate::router(state),
            get("/api/oauth/mercadopago/callback?code=TG-code&state=forged.state", None),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.find("u1", ProviderId::MercadoPago).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn callback_surfaces_denied_authorization() {
        let (state, _) = test_state(test_config("http://mp.invalid"));
        let (status, body) = send(
            crate::router(state),
            get("/api/oauth/mercadopago/callback?error=access_denied", None),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Authorization denied: access_denied");
    }
}
