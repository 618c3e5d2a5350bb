//! In-process issues table.
//!
//! Backs `serve --memory` and the test suites. Rows are kept as JSON so the
//! repository goes through the same `decode_row` gate as with the hosted
//! store, and tests can plant malformed rows with `insert_raw`.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::models::{IssueDraft, IssuePatch};
use super::store::{IssueStore, Row};
use crate::errors::StoreError;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Default)]
struct MemoryTable {
    /// Newest first.
    rows: Vec<Value>,
    failures: VecDeque<(StoreOp, String)>,
}

impl MemoryTable {
    fn take_failure(&mut self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(pos) = self.failures.iter().position(|(o, _)| *o == op) {
            let (_, message) = self.failures.remove(pos).unwrap_or((op, String::new()));
            return Err(StoreError::Unavailable(message));
        }
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_str) == Some(id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<MemoryTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `StoreError::Unavailable(message)`.
    pub async fn fail_next(&self, op: StoreOp, message: impl Into<String>) {
        self.table
            .lock()
            .await
            .failures
            .push_back((op, message.into()));
    }

    /// Put a row in the table verbatim, as the newest entry.
    pub async fn insert_raw(&self, row: Value) {
        self.table.lock().await.rows.insert(0, row);
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn select_all(&self) -> Result<Vec<Row>, StoreError> {
        let mut table = self.table.lock().await;
        table.take_failure(StoreOp::Select)?;
        Ok(table.rows.clone())
    }

    async fn insert(&self, draft: &IssueDraft) -> Result<Row, StoreError> {
        let mut table = self.table.lock().await;
        table.take_failure(StoreOp::Insert)?;
        let stamp = now();
        let row = json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "title": draft.title,
            "description": draft.description,
            "status": draft.status,
            "priority": draft.priority,
            "type": draft.kind,
            "assignee": draft.assignee,
            "reporter": draft.reporter,
            "estimate": draft.estimate,
            "created_at": stamp,
            "updated_at": stamp,
        });
        table.rows.insert(0, row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Row, StoreError> {
        let mut table = self.table.lock().await;
        table.take_failure(StoreOp::Update)?;
        let pos = table
            .position(id)
            .ok_or_else(|| StoreError::NoRow { id: id.to_string() })?;

        let changes = serde_json::to_value(patch)
            .map_err(|e| StoreError::Unavailable(format!("Failed to encode patch: {}", e)))?;
        let row = &mut table.rows[pos];
        if let (Some(target), Value::Object(changes)) = (row.as_object_mut(), changes) {
            for (key, value) in changes {
                target.insert(key, value);
            }
            target.insert("updated_at".to_string(), Value::String(now()));
        }
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        table.take_failure(StoreOp::Delete)?;
        if let Some(pos) = table.position(id) {
            table.rows.remove(pos);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::models::IssueStatus;
    use crate::board::store::decode_row;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let row = store
            .insert(&IssueDraft::new("Title", "Body", "Alice"))
            .await
            .unwrap();
        let issue = decode_row(row).unwrap();
        assert!(!issue.id.is_empty());
        assert_eq!(issue.created_at, issue.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_select_all_returns_newest_first() {
        let store = MemoryStore::new();
        store.insert(&IssueDraft::new("first", "Body", "A")).await.unwrap();
        store.insert(&IssueDraft::new("second", "Body", "A")).await.unwrap();
        let rows = store.select_all().await.unwrap();
        assert_eq!(rows[0]["title"], "second");
        assert_eq!(rows[1]["title"], "first");
    }

    #[tokio::test]
    async fn test_update_merges_patch_and_refreshes_updated_at() {
        let store = MemoryStore::new();
        let row = store
            .insert(&IssueDraft::new("Title", "Body", "Alice").with_estimate(5.0))
            .await
            .unwrap();
        let id = row["id"].as_str().unwrap().to_string();
        let patch = IssuePatch {
            status: Some(IssueStatus::Done),
            estimate: Some(None),
            ..IssuePatch::default()
        };
        let updated = decode_row(store.update(&id, &patch).await.unwrap()).unwrap();
        assert_eq!(updated.status, IssueStatus::Done);
        assert_eq!(updated.title, "Title");
        assert!(updated.estimate.is_none());
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_row_fails() {
        let store = MemoryStore::new();
        let err = store
            .update("nope", &IssuePatch::status(IssueStatus::Done))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoRow { .. }));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once_to_matching_op() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::Select, "network down").await;

        // Other operations are unaffected.
        store.insert(&IssueDraft::new("Title", "Body", "A")).await.unwrap();

        let err = store.select_all().await.unwrap_err();
        assert!(err.to_string().contains("network down"));
        assert_eq!(store.select_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let store = MemoryStore::new();
        let row = store.insert(&IssueDraft::new("Title", "Body", "A")).await.unwrap();
        store.delete(row["id"].as_str().unwrap()).await.unwrap();
        assert!(store.is_empty().await);
    }
}
