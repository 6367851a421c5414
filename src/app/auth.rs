use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::error::ApiError;
use crate::app::state::AppState;

const AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// The verified caller, passed explicitly into every handler that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<AuthUser, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(AuthUser {
        user_id: data.claims.sub,
    })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.config.supabase_jwt_secret.as_deref() else {
            warn!("SUPABASE_JWT_SECRET not set, rejecting authenticated request");
            return Err(ApiError::Unauthenticated);
        };
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;

        verify_access_token(token, secret).map_err(|e| {
            debug!("Rejected access token: {}", e);
            ApiError::Unauthenticated
        })
    }
}
