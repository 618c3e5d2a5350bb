//! Issue commands against the hosted store: `list`, `board`, `dashboard`,
//! `create`, `update`, `move`, `delete`, `seed`.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::{StyledObject, style};
use tracing::debug;

use issueboard::board::models::{
    Issue, IssueDraft, IssuePatch, IssueStatus, Priority, DEFAULT_REPORTER, seed_drafts,
};
use issueboard::board::repository::IssueRepository;
use issueboard::board::rest::RestStore;
use issueboard::board::views::{Filter, IssueQuery};
use issueboard::config::BoardConfig;

use super::super::FieldArgs;

/// Repository over the hosted store. Missing store parameters fail here,
/// before any request is sent.
pub fn connect(config: &BoardConfig) -> Result<IssueRepository> {
    let store_config = config.store()?;
    let store = RestStore::new(&store_config)?;
    debug!(endpoint = store.endpoint(), "using hosted issue store");
    Ok(IssueRepository::new(Arc::new(store)))
}

async fn connect_loaded(config: &BoardConfig) -> Result<IssueRepository> {
    let repo = connect(config)?;
    let report = repo.load().await?;
    if report.rejected > 0 {
        eprintln!(
            "{} skipped {} malformed issue row(s)",
            style("Warning:").yellow().bold(),
            report.rejected
        );
    }
    Ok(repo)
}

// ── Rendering ─────────────────────────────────────────────────────────

fn styled_status(status: IssueStatus) -> StyledObject<&'static str> {
    let label = status.label();
    match status {
        IssueStatus::Todo => style(label).dim(),
        IssueStatus::InProgress => style(label).yellow(),
        IssueStatus::Done => style(label).green(),
    }
}

fn styled_priority(priority: Priority) -> StyledObject<&'static str> {
    let label = priority.label();
    match priority {
        Priority::Low => style(label).dim(),
        Priority::Medium => style(label).cyan(),
        Priority::High => style(label).red(),
        Priority::Urgent => style(label).red().bold(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

fn print_issue_table(issues: &[Issue]) {
    println!(
        "{:<36}  {:<11}  {:<6}  {:<5}  {:<4}  Title",
        "ID", "Status", "Prio", "Type", "Est"
    );
    println!(
        "{:<36}  {:<11}  {:<6}  {:<5}  {:<4}  -----",
        "-".repeat(36),
        "-----------",
        "------",
        "-----",
        "----"
    );
    for issue in issues {
        let estimate = issue
            .estimate
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36}  {:<11}  {:<6}  {:<5}  {:<4}  {}",
            issue.id,
            styled_status(issue.status),
            styled_priority(issue.priority),
            issue.kind.label(),
            estimate,
            issue.title
        );
    }
}

fn print_issue_detail(heading: &str, issue: &Issue) {
    println!("{} {}", style(heading).green().bold(), issue.title);
    println!("  id:        {}", issue.id);
    println!("  status:    {}", styled_status(issue.status));
    println!("  priority:  {}", styled_priority(issue.priority));
    println!("  type:      {}", issue.kind.label());
    println!("  assignee:  {}", issue.assignee);
    println!("  reporter:  {}", issue.reporter);
    if let Some(estimate) = issue.estimate {
        println!("  estimate:  {}", estimate);
    }
    println!("  updated:   {}", issue.updated_date());
}

// ── Commands ──────────────────────────────────────────────────────────

pub async fn cmd_list(
    config: &BoardConfig,
    search: String,
    status: Filter<IssueStatus>,
    priority: Filter<Priority>,
    json: bool,
) -> Result<()> {
    let repo = connect_loaded(config).await?;
    let query = IssueQuery {
        search,
        status,
        priority,
    };
    let matching = repo.query(&query);

    if json {
        return print_json(&matching);
    }

    println!();
    print_issue_table(&matching);
    println!();
    println!("{}", style(query.summary(&repo.issues())).dim());
    Ok(())
}

pub async fn cmd_board(config: &BoardConfig, json: bool) -> Result<()> {
    let repo = connect_loaded(config).await?;
    let board = repo.board();

    if json {
        return print_json(&board);
    }

    for column in &board.columns {
        println!();
        println!(
            "{} {}",
            styled_status(column.status).bold(),
            style(format!("({})", column.count)).dim()
        );
        if column.issues.is_empty() {
            println!("  {}", style("No issues").dim());
        }
        for issue in &column.issues {
            println!(
                "  [{}] {}  {}",
                issue.assignee_initials(),
                issue.title,
                styled_priority(issue.priority)
            );
        }
    }
    println!();
    Ok(())
}

pub async fn cmd_dashboard(config: &BoardConfig, recent: usize, json: bool) -> Result<()> {
    let repo = connect_loaded(config).await?;
    let dashboard = repo.dashboard(recent);

    if json {
        return print_json(&dashboard);
    }

    println!();
    println!("{}", style("Issue Dashboard").bold().cyan());
    println!();
    for bar in &dashboard.chart {
        println!(
            "  {:<12} {:>4}  {}",
            bar.name,
            bar.count,
            style("█".repeat(bar.count)).cyan()
        );
    }
    println!();
    println!("{}", style("Recently updated").bold());
    if dashboard.recent.is_empty() {
        println!("  {}", style("No issues").dim());
    }
    for issue in &dashboard.recent {
        println!(
            "  {}  {:<11}  {}",
            issue.updated_date(),
            styled_status(issue.status),
            issue.title
        );
    }
    println!();
    Ok(())
}

/// Missing title, description or assignee reach validation as empty
/// strings and are reported like any other invalid field.
fn draft_from(fields: FieldArgs) -> IssueDraft {
    let mut draft = IssueDraft::new(
        fields.title.unwrap_or_default(),
        fields.description.unwrap_or_default(),
        fields.assignee.unwrap_or_default(),
    );
    if let Some(status) = fields.status {
        draft.status = status;
    }
    if let Some(priority) = fields.priority {
        draft.priority = priority;
    }
    if let Some(kind) = fields.kind {
        draft.kind = kind;
    }
    draft.reporter = fields
        .reporter
        .unwrap_or_else(|| DEFAULT_REPORTER.to_string());
    draft.estimate = fields.estimate;
    draft
}

fn patch_from(fields: FieldArgs, clear_estimate: bool) -> IssuePatch {
    let estimate = if clear_estimate {
        Some(None)
    } else {
        fields.estimate.map(Some)
    };
    IssuePatch {
        title: fields.title,
        description: fields.description,
        status: fields.status,
        priority: fields.priority,
        kind: fields.kind,
        assignee: fields.assignee,
        reporter: fields.reporter,
        estimate,
    }
}

pub async fn cmd_create(config: &BoardConfig, fields: FieldArgs) -> Result<()> {
    let repo = connect(config)?;
    let issue = repo.create(draft_from(fields)).await?;
    print_issue_detail("Created", &issue);
    Ok(())
}

pub async fn cmd_update(
    config: &BoardConfig,
    id: &str,
    fields: FieldArgs,
    clear_estimate: bool,
) -> Result<()> {
    let patch = patch_from(fields, clear_estimate);
    if patch.is_empty() {
        anyhow::bail!("Nothing to update: pass at least one field flag");
    }
    let repo = connect_loaded(config).await?;
    let issue = repo.update(id, patch).await?;
    print_issue_detail("Updated", &issue);
    Ok(())
}

pub async fn cmd_move(config: &BoardConfig, id: &str, status: IssueStatus) -> Result<()> {
    let repo = connect_loaded(config).await?;
    let issue = repo.update(id, IssuePatch::status(status)).await?;
    println!(
        "{} {} to {}",
        style("Moved").green().bold(),
        issue.title,
        styled_status(issue.status)
    );
    Ok(())
}

pub async fn cmd_delete(config: &BoardConfig, id: &str) -> Result<()> {
    let repo = connect(config)?;
    repo.delete(id).await?;
    println!("{} issue {}", style("Deleted").green().bold(), id);
    Ok(())
}

pub async fn cmd_seed(config: &BoardConfig) -> Result<()> {
    let repo = connect(config)?;
    let drafts = seed_drafts();
    let total = drafts.len();
    for draft in drafts {
        let issue = repo.create(draft).await?;
        println!("  {} {}", style("+").green(), issue.title);
    }
    println!("{} {} sample issues", style("Seeded").green().bold(), total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults_reporter() {
        let draft = draft_from(FieldArgs {
            title: Some("Fix crash".into()),
            description: Some("Boom".into()),
            assignee: Some("Alice".into()),
            ..Default::default()
        });
        assert_eq!(draft.reporter, DEFAULT_REPORTER);
        assert_eq!(draft.status, IssueStatus::Todo);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_draft_missing_title_fails_validation() {
        let draft = draft_from(FieldArgs::default());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_patch_clear_estimate() {
        let patch = patch_from(FieldArgs::default(), true);
        assert_eq!(patch.estimate, Some(None));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_set_estimate() {
        let patch = patch_from(
            FieldArgs {
                estimate: Some(8.0),
                ..Default::default()
            },
            false,
        );
        assert_eq!(patch.estimate, Some(Some(8.0)));
    }

    #[test]
    fn test_patch_without_fields_is_empty() {
        assert!(patch_from(FieldArgs::default(), false).is_empty());
    }
}
