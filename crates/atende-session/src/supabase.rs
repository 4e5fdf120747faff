//! Supabase session backend (PostgREST over HTTPS).

use crate::sqlite::check_table_name;
use async_trait::async_trait;
use atende_core::{error::AtendeError, traits::SessionBackend};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session table exposed through Supabase's REST API.
pub struct SupabaseBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

#[derive(Serialize)]
struct SessionRow<'a> {
    id: &'a str,
    session_data: &'a str,
    updated_at: String,
}

#[derive(Deserialize)]
struct SessionDataRow {
    session_data: Option<String>,
}

impl SupabaseBackend {
    /// Create from the project URL (e.g. `https://xyz.supabase.co`) and API key.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, AtendeError> {
        check_table_name(table)?;
        if base_url.trim().is_empty() {
            return Err(AtendeError::Config("supabase_url is empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Turn a non-2xx response into a store error carrying the body.
    async fn check(op: &str, resp: reqwest::Response) -> Result<reqwest::Response, AtendeError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(AtendeError::Store(format!(
            "supabase {op} failed ({status}): {text}"
        )))
    }
}

#[async_trait]
impl SessionBackend for SupabaseBackend {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, AtendeError> {
        let url = self.table_url();
        debug!("supabase: GET {url} id={key}");

        let resp = self
            .authed(self.client.get(&url))
            .query(&[("id", format!("eq.{key}")), ("select", "session_data".into())])
            .send()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase select request failed: {e}")))?;
        let resp = Self::check("select", resp).await?;

        let rows: Vec<SessionDataRow> = resp
            .json()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase select parse failed: {e}")))?;

        Ok(rows.into_iter().next().and_then(|r| r.session_data))
    }

    /// Upsert on the primary key. `created_at` is left to the column default
    /// so an overwrite never resets it.
    async fn upsert(&self, key: &str, blob: &str) -> Result<(), AtendeError> {
        let url = self.table_url();
        debug!("supabase: POST {url} id={key}");

        let row = SessionRow {
            id: key,
            session_data: blob,
            updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let resp = self
            .authed(self.client.post(&url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase upsert request failed: {e}")))?;
        Self::check("upsert", resp).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AtendeError> {
        let url = self.table_url();
        debug!("supabase: DELETE {url} id={key}");

        let resp = self
            .authed(self.client.delete(&url))
            .query(&[("id", format!("eq.{key}"))])
            .send()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase delete request failed: {e}")))?;
        Self::check("delete", resp).await?;
        Ok(())
    }

    async fn has_rows(&self) -> Result<bool, AtendeError> {
        let resp = self
            .authed(self.client.get(self.table_url()))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase ping request failed: {e}")))?;
        let resp = Self::check("ping", resp).await?;

        let rows: Vec<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| AtendeError::Store(format!("supabase ping parse failed: {e}")))?;
        Ok(!rows.is_empty())
    }
}
