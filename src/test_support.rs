use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::app::config::Config;
use crate::app::state::AppState;
use crate::services::MemoryConnectionStore;

pub const JWT_SECRET: &str = "test-jwt-secret";

pub fn test_config(mercadopago_api_url: &str) -> Config {
    Config {
        host: "127.0.0.1".into(),
        server_port: 0,
        mercadopago_client_id: Some("client-123".into()),
        mercadopago_client_secret: Some("secret-456".into()),
        mercadopago_redirect_uri: None,
        mercadopago_api_url: mercadopago_api_url.into(),
        mercadopago_auth_url: "https://auth.mercadopago.test".into(),
        mercadopago_platform_id: "mp".into(),
        public_base_url: None,
        supabase_url: None,
        supabase_service_key: None,
        supabase_jwt_secret: Some(JWT_SECRET.into()),
        oauth_state_secret: Some("state-secret".into()),
        oauth_state_ttl_secs: 600,
        http_timeout_ms: 5_000,
        trust_forwarded_headers: false,
    }
}

pub fn test_state(config: Config) -> (AppState, Arc<MemoryConnectionStore>) {
    let store = Arc::new(MemoryConnectionStore::new());
    let state = AppState::with_store(config, Client::new(), store.clone());
    (state, store)
}

pub fn sign_token(sub: &str) -> String {
    encode(
        &Header::default(),
        &json!({"sub": sub, "aud": "authenticated", "exp": Utc::now().timestamp() + 3600}),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri).header(header::HOST, "pos.local");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", sign_token(user)));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", sign_token(user)));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
