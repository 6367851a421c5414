//! Credential Store: one `TerminalConnection` row per (user, provider).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::{ProviderId, TerminalConnection};

const TABLE: &str = "terminal_connections";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TerminalConnection>, StoreError>;

    /// Inserts or merges on (user_id, provider).
    async fn upsert(&self, connection: TerminalConnection) -> Result<(), StoreError>;

    /// Returns the number of rows updated; never inserts.
    async fn select_device(
        &self,
        user_id: &str,
        provider: ProviderId,
        device_id: &str,
        device_name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct MemoryConnectionStore {
    rows: DashMap<(String, ProviderId), TerminalConnection>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TerminalConnection>, StoreError> {
        Ok(self
            .rows
            .get(&(user_id.to_string(), provider))
            .map(|entry| entry.clone()))
    }

    async fn upsert(&self, connection: TerminalConnection) -> Result<(), StoreError> {
        let key = (connection.user_id.clone(), connection.provider);
        self.rows.insert(key, connection);
        Ok(())
    }

    async fn select_device(
        &self,
        user_id: &str,
        provider: ProviderId,
        device_id: &str,
        device_name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        match self.rows.get_mut(&(user_id.to_string(), provider)) {
            Some(mut row) => {
                row.selected_device_id = Some(device_id.to_string());
                row.selected_device_name = Some(device_name.to_string());
                row.updated_at = updated_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// PostgREST access to the managed Postgres, authenticated with the
/// service-role key.
pub struct SupabaseConnectionStore {
    client: Client,
    table_url: String,
    service_key: String,
}

impl SupabaseConnectionStore {
    pub fn new(client: Client, supabase_url: &str, service_key: impl Into<String>) -> Self {
        Self {
            client,
            table_url: format!("{}/rest/v1/{}", supabase_url.trim_end_matches('/'), TABLE),
            service_key: service_key.into(),
        }
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn row_filter(user_id: &str, provider: ProviderId) -> [(&'static str, String); 2] {
        [
            ("user_id", format!("eq.{user_id}")),
            ("provider", format!("eq.{provider}")),
        ]
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Status { status, body })
        }
    }
}

#[async_trait]
impl ConnectionStore for SupabaseConnectionStore {
    async fn find(
        &self,
        user_id: &str,
        provider: ProviderId,
    ) -> Result<Option<TerminalConnection>, StoreError> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&Self::row_filter(user_id, provider))
            .query(&[("select", "*"), ("limit", "1")])
            .send()
            .await?;

        let rows: Vec<TerminalConnection> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, connection: TerminalConnection) -> Result<(), StoreError> {
        debug!(user_id = %connection.user_id, provider = %connection.provider, "upserting connection");

        let response = self
            .request(reqwest::Method::POST)
            .query(&[("on_conflict", "user_id,provider")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&connection)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn select_device(
        &self,
        user_id: &str,
        provider: ProviderId,
        device_id: &str,
        device_name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let response = self
            .request(reqwest::Method::PATCH)
            .query(&Self::row_filter(user_id, provider))
            .header("Prefer", "return=representation")
            .json(&json!({
                "selected_device_id": device_id,
                "selected_device_name": device_name,
                "updated_at": updated_at,
            }))
            .send()
            .await?;

        let rows: Vec<serde_json::Value> = Self::check(response).await?.json().await?;
        Ok(rows.len() as u64)
    }
}
