use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ValidationError;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const ESTIMATE_MIN: f64 = 1.0;
pub const ESTIMATE_MAX: f64 = 100.0;

/// Reporter recorded for drafts created without an authenticated user.
pub const DEFAULT_REPORTER: &str = "Current User";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Todo,
    #[serde(rename = "inprogress")]
    InProgress,
    Done,
}

impl IssueStatus {
    /// Board columns, left to right.
    pub const ALL: [IssueStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Story,
    Bug,
    Task,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Bug => "bug",
            Self::Task => "task",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Story => "Story",
            Self::Bug => "Bug",
            Self::Task => "Task",
        }
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(Self::Story),
            "bug" => Ok(Self::Bug),
            "task" => Ok(Self::Task),
            _ => Err(format!("Invalid issue type: {}", s)),
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A confirmed issue, as held in the canonical collection.
///
/// Only ever built from a store row via `store::decode_row`, so the id and
/// both timestamps are always the ones the store assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: IssueType,
    pub assignee: String,
    pub reporter: String,
    pub estimate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Creation day as `YYYY-MM-DD`.
    pub fn created_date(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }

    /// Last update day as `YYYY-MM-DD`.
    pub fn updated_date(&self) -> String {
        self.updated_at.format("%Y-%m-%d").to_string()
    }

    /// "Alice Johnson" -> "AJ".
    pub fn assignee_initials(&self) -> String {
        self.assignee
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .collect()
    }
}

/// Fields for a new issue. The store assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: IssueType,
    pub assignee: String,
    pub reporter: String,
    pub estimate: Option<f64>,
}

impl IssueDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        assignee: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: IssueStatus::Todo,
            priority: Priority::Medium,
            kind: IssueType::Task,
            assignee: assignee.into(),
            reporter: DEFAULT_REPORTER.to_string(),
            estimate: None,
        }
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_kind(mut self, kind: IssueType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = reporter.into();
        self
    }

    pub fn with_estimate(mut self, estimate: f64) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("title", &self.title, TITLE_MAX_CHARS)?;
        check_text("description", &self.description, DESCRIPTION_MAX_CHARS)?;
        check_assignee(&self.assignee)?;
        if let Some(estimate) = self.estimate {
            check_estimate(estimate)?;
        }
        Ok(())
    }
}

/// A partial update. `None` leaves a field untouched; `estimate: Some(None)`
/// clears the estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IssuePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<IssueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimate: Option<Option<f64>>,
}

impl IssuePatch {
    pub fn status(status: IssueStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            check_text("title", title, TITLE_MAX_CHARS)?;
        }
        if let Some(description) = &self.description {
            check_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        if let Some(assignee) = &self.assignee {
            check_assignee(assignee)?;
        }
        if let Some(Some(estimate)) = self.estimate {
            check_estimate(estimate)?;
        }
        Ok(())
    }
}

/// Keeps an explicit `null` distinct from a missing field:
/// missing -> `None` (via `default`), `null` -> `Some(None)`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

fn check_assignee(assignee: &str) -> Result<(), ValidationError> {
    if assignee.trim().is_empty() {
        return Err(ValidationError::Empty { field: "assignee" });
    }
    Ok(())
}

pub(crate) fn check_estimate(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (ESTIMATE_MIN..=ESTIMATE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::EstimateOutOfRange { value })
    }
}

/// Sample issues used by `seed` and the offline demo board.
pub fn seed_drafts() -> Vec<IssueDraft> {
    vec![
        IssueDraft::new(
            "Set up project documentation",
            "Write setup instructions and API documentation for new contributors.",
            "Charlie Brown",
        )
        .with_status(IssueStatus::Done)
        .with_priority(Priority::Low)
        .with_reporter("Jane Smith")
        .with_estimate(5.0),
        IssueDraft::new(
            "Optimize database queries",
            "Improve performance of the slow queries behind the user dashboard.",
            "David Lee",
        )
        .with_priority(Priority::High)
        .with_reporter("John Doe")
        .with_estimate(13.0),
        IssueDraft::new(
            "Fix responsive layout on mobile devices",
            "The navigation menu does not display correctly on screens narrower than 768px.",
            "Alice Johnson",
        )
        .with_kind(IssueType::Bug)
        .with_reporter("Bob Wilson")
        .with_estimate(3.0),
        IssueDraft::new(
            "Implement user authentication system",
            "Secure login, registration and password reset.",
            "John Doe",
        )
        .with_status(IssueStatus::InProgress)
        .with_priority(Priority::High)
        .with_kind(IssueType::Story)
        .with_reporter("Jane Smith")
        .with_estimate(8.0),
        IssueDraft::new(
            "Payment gateway times out under load",
            "Checkout requests fail after 30 seconds when more than 50 users pay at once.",
            "Eve Martinez",
        )
        .with_status(IssueStatus::InProgress)
        .with_priority(Priority::Urgent)
        .with_kind(IssueType::Bug)
        .with_reporter("Bob Wilson"),
    ]
}
