//! Board server command: `issueboard serve`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use issueboard::board::memory::MemoryStore;
use issueboard::board::models::seed_drafts;
use issueboard::board::repository::IssueRepository;
use issueboard::board::server::{ServerConfig, start_server};
use issueboard::board::store::IssueStore;
use issueboard::config::BoardConfig;

use super::issues::connect;

pub async fn cmd_serve(
    config: &BoardConfig,
    port: Option<u16>,
    dev: bool,
    memory: bool,
) -> Result<()> {
    let repo = if memory {
        let store = MemoryStore::new();
        for draft in seed_drafts() {
            store
                .insert(&draft)
                .await
                .context("Failed to seed the in-memory table")?;
        }
        info!(issues = store.len().await, "serving from an in-memory table");
        IssueRepository::new(Arc::new(store))
    } else {
        connect(config)?
    };

    start_server(
        ServerConfig {
            port: port.unwrap_or(config.port),
            dev_mode: dev,
        },
        Arc::new(repo),
    )
    .await
}
