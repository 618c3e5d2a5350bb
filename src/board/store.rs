//! Remote Store Client contract and the row validation gate.
//!
//! The hosted table hands back loosely typed JSON. Nothing past this module
//! sees a raw row: `decode_row` is the only way to obtain an `Issue`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::models::{
    Issue, IssueDraft, IssuePatch, IssueStatus, IssueType, Priority, check_estimate,
};
use crate::errors::{RecordError, StoreError};

/// A row as returned by the store, before validation.
pub type Row = Value;

/// The four table operations the repository relies on.
/// Real implementation: `RestStore`. In-process double: `MemoryStore`.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// All rows, newest `created_at` first.
    async fn select_all(&self) -> Result<Vec<Row>, StoreError>;

    /// Insert one row and return it as stored (id and timestamps assigned).
    async fn insert(&self, draft: &IssueDraft) -> Result<Row, StoreError>;

    /// Apply `patch` to the row with `id`, refresh its `updated_at`, and
    /// return the stored row. Fails if no row matches.
    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Row, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct IssueRow {
    id: RowId,
    title: String,
    description: String,
    status: String,
    priority: String,
    #[serde(rename = "type")]
    kind: String,
    assignee: String,
    #[serde(default)]
    reporter: Option<String>,
    #[serde(default)]
    estimate: Option<f64>,
    created_at: String,
    updated_at: String,
}

/// Validate a store row and convert it into an `Issue`.
pub fn decode_row(row: Row) -> Result<Issue, RecordError> {
    let row: IssueRow = serde_json::from_value(row).map_err(RecordError::Shape)?;

    let id = match row.id {
        RowId::Text(id) => id,
        RowId::Number(n) => n.to_string(),
    };
    if id.trim().is_empty() {
        return Err(RecordError::EmptyId);
    }

    let status = row
        .status
        .parse::<IssueStatus>()
        .map_err(|_| RecordError::InvalidField {
            field: "status",
            value: row.status.clone(),
        })?;
    let priority = row
        .priority
        .parse::<Priority>()
        .map_err(|_| RecordError::InvalidField {
            field: "priority",
            value: row.priority.clone(),
        })?;
    let kind = row
        .kind
        .parse::<IssueType>()
        .map_err(|_| RecordError::InvalidField {
            field: "type",
            value: row.kind.clone(),
        })?;

    if let Some(estimate) = row.estimate {
        check_estimate(estimate).map_err(|_| RecordError::InvalidField {
            field: "estimate",
            value: estimate.to_string(),
        })?;
    }

    let created_at = parse_timestamp("created_at", &row.created_at)?;
    let updated_at = parse_timestamp("updated_at", &row.updated_at)?;
    if updated_at < created_at {
        return Err(RecordError::TimestampOrder { id });
    }

    Ok(Issue {
        id,
        title: row.title,
        description: row.description,
        status,
        priority,
        kind,
        assignee: row.assignee,
        reporter: row.reporter.unwrap_or_default(),
        estimate: row.estimate,
        created_at,
        updated_at,
    })
}

/// Accepts RFC 3339, a naive `timestamp` column (read as UTC), or a bare date.
pub(crate) fn parse_timestamp(
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts.and_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ts.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(RecordError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}
