//! Derived views over the canonical collection.
//!
//! Everything here is a pure function of its inputs: same issues and
//! parameters in, same sequence out. Filters keep canonical order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::{Issue, IssueStatus, Priority};

/// Number of issues the dashboard lists under "Recent".
pub const DEFAULT_RECENT: usize = 4;

/// A filter clause where `All` disables the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> Filter<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T: FromStr<Err = String>> FromStr for Filter<T> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

pub fn by_status(issues: &[Issue], status: IssueStatus) -> Vec<&Issue> {
    issues.iter().filter(|i| i.status == status).collect()
}

pub fn by_priority(issues: &[Issue], priority: Priority) -> Vec<&Issue> {
    issues.iter().filter(|i| i.priority == priority).collect()
}

/// Case-insensitive substring match on title, description or id.
/// An empty term matches everything.
pub fn matches_search(issue: &Issue, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    issue.title.to_lowercase().contains(&term)
        || issue.description.to_lowercase().contains(&term)
        || issue.id.to_lowercase().contains(&term)
}

pub fn search<'a>(issues: &'a [Issue], term: &str) -> Vec<&'a Issue> {
    issues.iter().filter(|i| matches_search(i, term)).collect()
}

/// Search AND status AND priority, as on the issue list page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    pub search: String,
    pub status: Filter<IssueStatus>,
    pub priority: Filter<Priority>,
}

impl IssueQuery {
    pub fn matches(&self, issue: &Issue) -> bool {
        matches_search(issue, &self.search)
            && self.status.accepts(&issue.status)
            && self.priority.accepts(&issue.priority)
    }

    pub fn apply<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues.iter().filter(|i| self.matches(i)).collect()
    }

    /// "Showing 3 of 10 issues".
    pub fn summary(&self, issues: &[Issue]) -> String {
        format!(
            "Showing {} of {} issues",
            self.apply(issues).len(),
            issues.len()
        )
    }
}

/// One bar of the status chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartBar {
    pub name: String,
    /// `None` for the Total bar.
    pub status: Option<IssueStatus>,
    pub count: usize,
}

/// Bars in chart order: To Do, In Progress, Done, Total.
pub fn status_counts(issues: &[Issue]) -> Vec<ChartBar> {
    let mut bars: Vec<ChartBar> = IssueStatus::ALL
        .iter()
        .map(|status| ChartBar {
            name: status.label().to_string(),
            status: Some(*status),
            count: issues.iter().filter(|i| i.status == *status).count(),
        })
        .collect();
    bars.push(ChartBar {
        name: "Total".to_string(),
        status: None,
        count: issues.len(),
    });
    bars
}

/// The `n` most recently updated issues; ties broken by id ascending.
pub fn most_recent(issues: &[Issue], n: usize) -> Vec<&Issue> {
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted.truncate(n);
    sorted
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardColumn {
    pub status: IssueStatus,
    pub title: String,
    pub count: usize,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
}

impl BoardView {
    pub fn column(&self, status: IssueStatus) -> Option<&BoardColumn> {
        self.columns.iter().find(|c| c.status == status)
    }
}

pub fn board(issues: &[Issue]) -> BoardView {
    let columns = IssueStatus::ALL
        .iter()
        .map(|status| {
            let issues: Vec<Issue> = by_status(issues, *status).into_iter().cloned().collect();
            BoardColumn {
                status: *status,
                title: status.label().to_string(),
                count: issues.len(),
                issues,
            }
        })
        .collect();
    BoardView { columns }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub chart: Vec<ChartBar>,
    pub recent: Vec<Issue>,
}

pub fn dashboard(issues: &[Issue], recent: usize) -> Dashboard {
    Dashboard {
        total: issues.len(),
        todo: by_status(issues, IssueStatus::Todo).len(),
        in_progress: by_status(issues, IssueStatus::InProgress).len(),
        done: by_status(issues, IssueStatus::Done).len(),
        chart: status_counts(issues),
        recent: most_recent(issues, recent).into_iter().cloned().collect(),
    }
}
