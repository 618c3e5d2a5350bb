//! Typed error hierarchy for the issue board.
//!
//! Errors are layered from the store boundary outwards:
//! - `ConfigError`: missing or malformed connection parameters (fatal at startup)
//! - `ValidationError`: a draft or patch violates an `Issue` invariant
//! - `RecordError`: a row returned by the store does not fit the `Issue` shape
//! - `StoreError`: any failure of a Remote Store Client call
//! - `BoardError`: what `IssueRepository` operations return to callers

use thiserror::Error;

/// Configuration errors. Any of these aborts startup of a store-backed command.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {name}: set it in the environment, .env or issueboard.toml")]
    Missing { name: &'static str },

    #[error("Invalid store URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A draft or patch field that breaks an issue invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("estimate must be a number between 1 and 100 (got {value})")]
    EstimateOutOfRange { value: f64 },
}

/// A store row that cannot be converted into an `Issue`.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Malformed issue row: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("Issue row has an empty id")]
    EmptyId,

    #[error("Invalid {field} '{value}' in issue row")]
    InvalidField { field: &'static str, value: String },

    #[error("Invalid {field} timestamp '{value}' in issue row")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Issue row {id} has updated_at before created_at")]
    TimestampOrder { id: String },
}

/// Failures of a Remote Store Client call. The repository treats all of
/// them uniformly as fetch or mutation failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store returned no issue with id {id}")]
    NoRow { id: String },

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Which repository mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by `IssueRepository` operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid issue: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to fetch issues: {0}")]
    Fetch(#[source] StoreError),

    #[error("Failed to {op} issue: {source}")]
    Mutation {
        op: MutationKind,
        #[source]
        source: StoreError,
    },

    #[error("Issue {id} not found")]
    IssueNotFound { id: String },

    #[error("Issue session is closed")]
    SessionClosed,
}
