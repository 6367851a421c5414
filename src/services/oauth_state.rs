//! Signed `state` blobs for the OAuth authorization redirect.
//!
//! The blob binds the provider callback to the user who started the
//! flow without a server-side session table. Format:
//! `base64url(json{userId,timestamp,nonce}) "." base64url(hmac_sha256(payload))`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
/// How far in the future a timestamp may sit and still verify.
const CLOCK_SKEW_MS: i64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub user_id: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub nonce: String,
}

impl OAuthState {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp: now.timestamp_millis(),
            nonce: Alphanumeric.sample_string(&mut rand::thread_rng(), NONCE_LEN),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("state is malformed")]
    Malformed,
    #[error("state signature mismatch")]
    BadSignature,
    #[error("state has expired")]
    Expired,
}

#[derive(Clone)]
pub struct StateSigner {
    key: Vec<u8>,
    ttl: Duration,
}

impl StateSigner {
    pub fn new(key: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
        }
    }

    /// Per-process key for when no secret is configured. States signed
    /// by one process won't verify in another.
    pub fn ephemeral(ttl: Duration) -> Self {
        let key = Alphanumeric.sample_string(&mut rand::rngs::OsRng, 48);
        Self::new(key.into_bytes(), ttl)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    pub fn sign(&self, state: &OAuthState) -> String {
        let json = serde_json::to_vec(state).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<OAuthState, StateError> {
        let (payload, signature) = token.split_once('.').ok_or(StateError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| StateError::Malformed)?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| StateError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| StateError::Malformed)?;
        let state: OAuthState = serde_json::from_slice(&json).map_err(|_| StateError::Malformed)?;

        let age_ms = now.timestamp_millis() - state.timestamp;
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms < -CLOCK_SKEW_MS || age_ms > ttl_ms {
            return Err(StateError::Expired);
        }

        Ok(state)
    }
}
