use super::row::MarkupRow;
use super::EntryStore;
use crate::errors::{JournalError, JournalResult};
use crate::markup::MarkupEntry;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

const TABLE_PATH: &str = "/rest/v1/markups";

/// Entry store on a hosted PostgREST table (Supabase). Rows travel as
/// snake_case JSON; see `MarkupRow`.
#[derive(Clone)]
pub struct RestEntryStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestEntryStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}{}", self.base_url, TABLE_PATH)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(resp: Response, what: &str) -> JournalResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), op = what, "entry store request failed");
        Err(JournalError::Store {
            status: status.as_u16(),
            body,
        })
    }

    /// PATCH and DELETE answer with the affected rows; none means the id is unknown.
    async fn expect_rows(resp: Response, id: &str, what: &str) -> JournalResult<()> {
        let resp = Self::check(resp, what).await?;
        let rows: Vec<MarkupRow> = resp
            .json()
            .await
            .map_err(|e| JournalError::Parse(format!("{what}: {e}")))?;
        if rows.is_empty() {
            return Err(JournalError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for RestEntryStore {
    async fn list(&self) -> JournalResult<Vec<MarkupEntry>> {
        let resp = self
            .authed(self.client.get(self.table_url()))
            .query(&[("select", "*"), ("order", "datetime_local.desc")])
            .send()
            .await?;
        let resp = Self::check(resp, "list").await?;

        let rows: Vec<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| JournalError::Parse(format!("list: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<MarkupRow>(value) {
                Ok(row) => Some(MarkupEntry::from(row)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable markup row");
                    None
                }
            })
            .collect())
    }

    async fn create(&self, entry: &MarkupEntry) -> JournalResult<()> {
        let resp = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(&MarkupRow::from(entry))
            .send()
            .await?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(JournalError::Conflict(entry.id.clone()));
        }
        Self::check(resp, "create").await?;
        Ok(())
    }

    async fn update(&self, entry: &MarkupEntry) -> JournalResult<()> {
        let resp = self
            .authed(self.client.patch(self.table_url()))
            .query(&[("id", format!("eq.{}", entry.id))])
            .header("Prefer", "return=representation")
            .json(&MarkupRow::from(entry))
            .send()
            .await?;
        Self::expect_rows(resp, &entry.id, "update").await
    }

    async fn remove(&self, id: &str) -> JournalResult<()> {
        let resp = self
            .authed(self.client.delete(self.table_url()))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::expect_rows(resp, id, "remove").await
    }
}
