//! The issue repository: single owner of the canonical collection.
//!
//! Every mutation waits for store confirmation before it touches the
//! collection, and each write happens under one short lock so readers never
//! observe a half-applied change. Concurrent mutations are not serialized:
//! whichever confirmation arrives last wins in local state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::models::{Issue, IssueDraft, IssuePatch, IssueStatus};
use super::notify::{Notification, Notifier};
use super::store::{IssueStore, decode_row};
use super::views::{self, BoardView, Dashboard, IssueQuery};
use crate::errors::{BoardError, MutationKind, StoreError};

/// Outcome of a successful `load()`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Rows skipped because they failed validation.
    pub rejected: usize,
}

pub struct IssueRepository {
    store: Arc<dyn IssueStore>,
    issues: RwLock<Vec<Issue>>,
    loads_in_flight: AtomicUsize,
    closed: AtomicBool,
    notifier: Notifier,
}

/// Decrements the in-flight load counter however `load()` exits.
struct LoadGuard<'a>(&'a AtomicUsize);

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl IssueRepository {
    pub fn new(store: Arc<dyn IssueStore>) -> Self {
        Self::with_notifier(store, Notifier::default())
    }

    pub fn with_notifier(store: Arc<dyn IssueStore>, notifier: Notifier) -> Self {
        Self {
            store,
            issues: RwLock::new(Vec::new()),
            loads_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            notifier,
        }
    }

    // ── Session state ────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.loads_in_flight.load(Ordering::SeqCst) > 0
    }

    /// End the session. Requests still in flight complete against the store
    /// but their results are dropped; later calls fail with `SessionClosed`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("issue session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BoardError> {
        if self.is_closed() {
            Err(BoardError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Issue>> {
        self.issues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Issue>> {
        self.issues.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot of the canonical collection, newest first.
    pub fn issues(&self) -> Vec<Issue> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Issue> {
        self.read().iter().find(|i| i.id == id).cloned()
    }

    pub fn by_status(&self, status: IssueStatus) -> Vec<Issue> {
        views::by_status(&self.read(), status)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn query(&self, query: &IssueQuery) -> Vec<Issue> {
        query.apply(&self.read()).into_iter().cloned().collect()
    }

    pub fn board(&self) -> BoardView {
        views::board(&self.read())
    }

    pub fn dashboard(&self, recent: usize) -> Dashboard {
        views::dashboard(&self.read(), recent)
    }

    // ── Store-backed operations ──────────────────────────────────────

    /// Replace the collection with the store's contents. On failure the
    /// previous collection is kept as is.
    pub async fn load(&self) -> Result<LoadReport, BoardError> {
        self.ensure_open()?;
        self.loads_in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = LoadGuard(&self.loads_in_flight);

        let rows = match self.store.select_all().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Error fetching issues");
                self.notifier.notify(Notification::error("Failed to fetch issues"));
                return Err(BoardError::Fetch(e));
            }
        };

        let mut fresh = Vec::with_capacity(rows.len());
        let mut rejected = 0usize;
        for row in rows {
            match decode_row(row) {
                Ok(issue) => fresh.push(issue),
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "Skipping invalid issue row");
                }
            }
        }

        let report = LoadReport {
            loaded: fresh.len(),
            rejected,
        };
        if self.is_closed() {
            debug!("session closed during load; discarding result");
            return Ok(report);
        }
        *self.write() = fresh;
        info!(loaded = report.loaded, rejected = report.rejected, "issues loaded");
        Ok(report)
    }

    /// Persist a new issue and prepend the confirmed record.
    pub async fn create(&self, draft: IssueDraft) -> Result<Issue, BoardError> {
        self.ensure_open()?;
        if let Err(e) = draft.validate() {
            return Err(self.mutation_failed(MutationKind::Create, e.into()));
        }

        let issue = match self.store.insert(&draft).await {
            Ok(row) => decode_row(row).map_err(StoreError::from),
            Err(e) => Err(e),
        };
        let issue = issue.map_err(|source| {
            self.mutation_failed(
                MutationKind::Create,
                BoardError::Mutation {
                    op: MutationKind::Create,
                    source,
                },
            )
        })?;

        if self.is_closed() {
            debug!(id = %issue.id, "session closed during create; discarding result");
            return Ok(issue);
        }
        self.write().insert(0, issue.clone());
        info!(id = %issue.id, status = %issue.status, "issue created");
        self.notifier
            .notify(Notification::success("Issue created successfully"));
        Ok(issue)
    }

    /// Apply `patch` to an existing issue and replace it in place with the
    /// confirmed record.
    pub async fn update(&self, id: &str, patch: IssuePatch) -> Result<Issue, BoardError> {
        self.ensure_open()?;
        if self.get(id).is_none() {
            return Err(self.mutation_failed(
                MutationKind::Update,
                BoardError::IssueNotFound { id: id.to_string() },
            ));
        }
        if let Err(e) = patch.validate() {
            return Err(self.mutation_failed(MutationKind::Update, e.into()));
        }

        let issue = match self.store.update(id, &patch).await {
            Ok(row) => decode_row(row).map_err(StoreError::from),
            Err(e) => Err(e),
        };
        let issue = issue.map_err(|source| {
            self.mutation_failed(
                MutationKind::Update,
                BoardError::Mutation {
                    op: MutationKind::Update,
                    source,
                },
            )
        })?;

        if self.is_closed() {
            debug!(id, "session closed during update; discarding result");
            return Ok(issue);
        }
        {
            let mut issues = self.write();
            match issues.iter_mut().find(|i| i.id == id) {
                Some(slot) => *slot = issue.clone(),
                None => debug!(id, "issue removed while update was in flight"),
            }
        }
        info!(id, status = %issue.status, "issue updated");
        self.notifier
            .notify(Notification::success("Issue updated successfully"));
        Ok(issue)
    }

    /// Delete in the store, then drop the entry locally.
    pub async fn delete(&self, id: &str) -> Result<(), BoardError> {
        self.ensure_open()?;
        if let Err(source) = self.store.delete(id).await {
            return Err(self.mutation_failed(
                MutationKind::Delete,
                BoardError::Mutation {
                    op: MutationKind::Delete,
                    source,
                },
            ));
        }

        if self.is_closed() {
            debug!(id, "session closed during delete; discarding result");
            return Ok(());
        }
        self.write().retain(|i| i.id != id);
        info!(id, "issue deleted");
        self.notifier
            .notify(Notification::success("Issue deleted successfully"));
        Ok(())
    }

    /// Log and announce a failed mutation, then hand the error back.
    fn mutation_failed(&self, op: MutationKind, err: BoardError) -> BoardError {
        error!(op = %op, error = %err, "Error during issue {}", op);
        self.notifier
            .notify(Notification::error(format!("Failed to {} issue", op)));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::memory::{MemoryStore, StoreOp};
    use crate::board::models::Priority;
    use crate::board::store::Row;
    use crate::errors::{RecordError, ValidationError};
    use serde_json::json;

    fn repo_with_store() -> (IssueRepository, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (IssueRepository::new(store.clone()), store)
    }

    fn draft(title: &str, status: IssueStatus) -> IssueDraft {
        IssueDraft::new(title, "Some description", "Alice Johnson").with_status(status)
    }

    /// Confirms writes with a row whose status the board does not know.
    struct CorruptConfirmations(MemoryStore);

    fn corrupt(mut row: Row) -> Row {
        row["status"] = json!("weird");
        row
    }

    #[async_trait::async_trait]
    impl IssueStore for CorruptConfirmations {
        async fn select_all(&self) -> Result<Vec<Row>, StoreError> {
            self.0.select_all().await
        }

        async fn insert(&self, draft: &IssueDraft) -> Result<Row, StoreError> {
            self.0.insert(draft).await.map(corrupt)
        }

        async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Row, StoreError> {
            self.0.update(id, patch).await.map(corrupt)
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_load_replaces_collection_in_store_order() {
        let (repo, store) = repo_with_store();
        store.insert(&draft("older", IssueStatus::Todo)).await.unwrap();
        store.insert(&draft("newer", IssueStatus::Todo)).await.unwrap();

        let report = repo.load().await.unwrap();
        assert_eq!(report, LoadReport { loaded: 2, rejected: 0 });
        let titles: Vec<String> = repo.issues().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, ["newer", "older"]);
        assert!(!repo.is_loading());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_collection() {
        let (repo, store) = repo_with_store();
        repo.create(draft("Fix crash", IssueStatus::Todo)).await.unwrap();
        store.fail_next(StoreOp::Select, "timeout").await;

        let mut rx = repo.subscribe();
        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, BoardError::Fetch(_)));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.issues()[0].title, "Fix crash");

        let note = rx.recv().await.unwrap();
        assert!(note.is_error());
        assert_eq!(note.description, "Failed to fetch issues");
        assert!(!repo.is_loading());
    }

    #[tokio::test]
    async fn test_load_skips_invalid_rows() {
        let (repo, store) = repo_with_store();
        store.insert(&draft("good", IssueStatus::Done)).await.unwrap();
        store
            .insert_raw(json!({"id": "bad", "title": "x", "status": "archived"}))
            .await;

        let report = repo.load().await.unwrap();
        assert_eq!(report, LoadReport { loaded: 1, rejected: 1 });
        assert!(repo.get("bad").is_none());
    }

    #[tokio::test]
    async fn test_create_prepends_confirmed_issue() {
        let (repo, _store) = repo_with_store();
        let first = repo.create(draft("first", IssueStatus::Todo)).await.unwrap();
        let second = repo.create(draft("second", IssueStatus::Todo)).await.unwrap();

        let ids: Vec<String> = repo.issues().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, [second.id.clone(), first.id.clone()]);
        assert!(!second.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_notifies_success() {
        let (repo, _store) = repo_with_store();
        let mut rx = repo.subscribe();
        repo.create(draft("Fix crash", IssueStatus::Todo)).await.unwrap();
        let note = rx.recv().await.unwrap();
        assert_eq!(note.description, "Issue created successfully");
        assert!(!note.is_error());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_collection_unchanged() {
        let (repo, store) = repo_with_store();
        store.fail_next(StoreOp::Insert, "insert failed").await;
        let mut rx = repo.subscribe();

        let err = repo.create(draft("Fix crash", IssueStatus::Todo)).await.unwrap_err();
        assert!(matches!(
            err,
            BoardError::Mutation {
                op: MutationKind::Create,
                ..
            }
        ));
        assert!(repo.is_empty());
        assert_eq!(rx.recv().await.unwrap().description, "Failed to create issue");
    }

    #[tokio::test]
    async fn test_create_with_invalid_confirmation_is_mutation_failure() {
        let repo = IssueRepository::new(Arc::new(CorruptConfirmations(MemoryStore::new())));
        let mut rx = repo.subscribe();

        let err = repo.create(draft("Fix crash", IssueStatus::Todo)).await.unwrap_err();
        assert!(matches!(
            err,
            BoardError::Mutation {
                op: MutationKind::Create,
                source: StoreError::Record(RecordError::InvalidField { .. }),
            }
        ));
        assert!(repo.is_empty());
        let note = rx.recv().await.unwrap();
        assert!(note.is_error());
        assert_eq!(note.description, "Failed to create issue");
    }

    #[tokio::test]
    async fn test_create_invalid_draft_never_reaches_store() {
        let (repo, store) = repo_with_store();
        let err = repo
            .create(IssueDraft::new("", "desc", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::Validation(ValidationError::Empty { field: "title" })
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let (repo, _store) = repo_with_store();
        let a = repo.create(draft("A", IssueStatus::Todo)).await.unwrap();
        let _b = repo.create(draft("B", IssueStatus::InProgress)).await.unwrap();
        let _c = repo.create(draft("C", IssueStatus::Done)).await.unwrap();
        let before: Vec<String> = repo.issues().into_iter().map(|i| i.id).collect();

        let updated = repo
            .update(&a.id, IssuePatch::status(IssueStatus::Done))
            .await
            .unwrap();
        assert_eq!(updated.status, IssueStatus::Done);
        assert!(updated.updated_at >= a.updated_at);
        assert_eq!(updated.created_at, a.created_at);

        let after: Vec<String> = repo.issues().into_iter().map(|i| i.id).collect();
        assert_eq!(before, after);
        assert!(repo.by_status(IssueStatus::Todo).is_empty());
        let done: Vec<String> = repo
            .by_status(IssueStatus::Done)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(done, ["C", "A"]);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails_without_store_call() {
        let (repo, store) = repo_with_store();
        store.fail_next(StoreOp::Update, "should not be consumed").await;
        let err = repo
            .update("missing", IssuePatch::status(IssueStatus::Done))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::IssueNotFound { .. }));

        // The injected failure is still queued, so the store was never called.
        let created = repo.create(draft("A", IssueStatus::Todo)).await.unwrap();
        assert!(
            repo.update(&created.id, IssuePatch::status(IssueStatus::Done))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_update_failure_leaves_collection_unchanged() {
        let (repo, store) = repo_with_store();
        let a = repo.create(draft("A", IssueStatus::Todo)).await.unwrap();
        store.fail_next(StoreOp::Update, "conflict").await;

        let result = repo
            .update(
                &a.id,
                IssuePatch {
                    priority: Some(Priority::Urgent),
                    ..IssuePatch::default()
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(repo.get(&a.id).unwrap(), a);
    }

    #[tokio::test]
    async fn test_update_with_invalid_confirmation_is_mutation_failure() {
        let inner = MemoryStore::new();
        inner.insert(&draft("A", IssueStatus::Todo)).await.unwrap();
        let repo = IssueRepository::new(Arc::new(CorruptConfirmations(inner)));
        repo.load().await.unwrap();
        let before = repo.issues();
        let id = before[0].id.clone();
        let mut rx = repo.subscribe();

        let err = repo
            .update(&id, IssuePatch::status(IssueStatus::Done))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BoardError::Mutation {
                op: MutationKind::Update,
                source: StoreError::Record(_),
            }
        ));
        assert_eq!(repo.issues(), before);
        let note = rx.recv().await.unwrap();
        assert!(note.is_error());
        assert_eq!(note.description, "Failed to update issue");
    }

    #[tokio::test]
    async fn test_delete_removes_after_confirmation() {
        let (repo, store) = repo_with_store();
        let a = repo.create(draft("A", IssueStatus::Todo)).await.unwrap();

        store.fail_next(StoreOp::Delete, "offline").await;
        assert!(repo.delete(&a.id).await.is_err());
        assert!(repo.get(&a.id).is_some());

        repo.delete(&a.id).await.unwrap();
        assert!(repo.get(&a.id).is_none());
        assert!(repo.by_status(IssueStatus::Todo).is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_operations() {
        let (repo, _store) = repo_with_store();
        repo.close();
        assert!(repo.is_closed());
        assert!(matches!(repo.load().await, Err(BoardError::SessionClosed)));
        assert!(matches!(
            repo.create(draft("A", IssueStatus::Todo)).await,
            Err(BoardError::SessionClosed)
        ));
        assert!(matches!(repo.delete("x").await, Err(BoardError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_query_and_views_read_canonical_collection() {
        let (repo, _store) = repo_with_store();
        repo.create(draft("Fix crash on login", IssueStatus::Todo)).await.unwrap();
        repo.create(draft("Write docs", IssueStatus::Done)).await.unwrap();

        let hits = repo.query(&IssueQuery {
            search: "CRASH".into(),
            ..IssueQuery::default()
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(repo.board().column(IssueStatus::Done).unwrap().count, 1);
        assert_eq!(repo.dashboard(4).total, 2);
    }
}
