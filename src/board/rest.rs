use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::models::{IssueDraft, IssuePatch};
use super::store::{IssueStore, Row};
use crate::config::StoreConfig;
use crate::errors::StoreError;

/// Accept header that makes the store return a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body returned by the hosted table on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct StoreErrorBody {
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

/// Client for the hosted issues table, speaking its PostgREST dialect.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("issueboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for the issue store")?;
        Ok(Self {
            client,
            endpoint: table_endpoint(&config.url, &config.table),
            key: config.key.expose().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }
}

/// `https://host/` + `issues` -> `https://host/rest/v1/issues`
pub fn table_endpoint(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

/// Turn a non-2xx response into `StoreError::Rejected`, preferring the
/// store's own `message` over the raw body.
async fn check_status(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status, &body),
    })
}

pub(crate) fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(StoreErrorBody {
        message: Some(mut message),
        details,
        hint,
    }) = serde_json::from_str::<StoreErrorBody>(body)
    {
        if let Some(details) = details.filter(|d| !d.is_empty()) {
            message.push_str(": ");
            message.push_str(&details);
        }
        if let Some(hint) = hint.filter(|h| !h.is_empty()) {
            message.push_str(&format!(" (hint: {})", hint));
        }
        return message;
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl IssueStore for RestStore {
    async fn select_all(&self) -> Result<Vec<Row>, StoreError> {
        debug!(endpoint = %self.endpoint, "selecting issues");
        let resp = self
            .authorize(self.client.get(&self.endpoint))
            .header("Accept", "application/json")
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        let rows = check_status(resp).await?.json::<Vec<Row>>().await?;
        debug!(count = rows.len(), "selected issues");
        Ok(rows)
    }

    async fn insert(&self, draft: &IssueDraft) -> Result<Row, StoreError> {
        debug!(title = %draft.title, "inserting issue");
        let resp = self
            .authorize(self.client.post(&self.endpoint))
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .query(&[("select", "*")])
            .json(&[draft])
            .send()
            .await?;
        Ok(check_status(resp).await?.json::<Row>().await?)
    }

    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Row, StoreError> {
        debug!(id, "updating issue");
        let mut body = serde_json::to_value(patch)
            .map_err(|e| StoreError::Unavailable(format!("Failed to encode patch: {}", e)))?;
        if let Value::Object(fields) = &mut body {
            fields.insert(
                "updated_at".to_string(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
        let resp = self
            .authorize(self.client.patch(&self.endpoint))
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .json(&body)
            .send()
            .await?;
        // The single-object Accept header turns "no matching row" into 406.
        if resp.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(StoreError::NoRow { id: id.to_string() });
        }
        Ok(check_status(resp).await?.json::<Row>().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        debug!(id, "deleting issue");
        let resp = self
            .authorize(self.client.delete(&self.endpoint))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
