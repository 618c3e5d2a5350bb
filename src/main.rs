use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use issueboard::board::models::{IssueStatus, IssueType, Priority};
use issueboard::board::views::{DEFAULT_RECENT, Filter};
use issueboard::config::BoardConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "issueboard")]
#[command(version, about = "Kanban issue board synchronized with a hosted issues table")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (defaults to ./issueboard.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Issue fields shared by `create` and `update`.
#[derive(clap::Args, Clone, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    /// todo, inprogress or done
    #[arg(long)]
    pub status: Option<IssueStatus>,
    /// low, medium, high or urgent
    #[arg(long)]
    pub priority: Option<Priority>,
    /// story, bug or task
    #[arg(long = "type")]
    pub kind: Option<IssueType>,
    #[arg(long)]
    pub reporter: Option<String>,
    /// Story points, 1 to 100
    #[arg(long)]
    pub estimate: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the JSON API and WebSocket feed
    Serve {
        /// Port to serve on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (CORS permissive, bind all interfaces)
        #[arg(long)]
        dev: bool,

        /// Use an in-process table seeded with sample issues instead of the hosted store
        #[arg(long)]
        memory: bool,
    },
    /// List issues, optionally filtered
    List {
        /// Case-insensitive match on id, title or description
        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(long, default_value = "all")]
        status: Filter<IssueStatus>,

        #[arg(long, default_value = "all")]
        priority: Filter<Priority>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the three board columns
    Board {
        #[arg(long)]
        json: bool,
    },
    /// Show totals and most recently updated issues
    Dashboard {
        #[arg(long, default_value_t = DEFAULT_RECENT)]
        recent: usize,

        #[arg(long)]
        json: bool,
    },
    /// Create an issue
    Create {
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Update fields of an existing issue
    Update {
        id: String,

        #[command(flatten)]
        fields: FieldArgs,

        /// Remove the estimate
        #[arg(long, conflicts_with = "estimate")]
        clear_estimate: bool,
    },
    /// Move an issue to another column
    Move { id: String, status: IssueStatus },
    /// Delete an issue
    Delete { id: String },
    /// Insert the sample issues
    Seed,
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BoardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    issueboard::logging::init(&config.log_level, config.log_format, cli.verbose)?;

    match cli.command {
        Commands::Serve { port, dev, memory } => {
            cmd::cmd_serve(&config, port, dev, memory).await?;
        }
        Commands::List {
            search,
            status,
            priority,
            json,
        } => cmd::cmd_list(&config, search, status, priority, json).await?,
        Commands::Board { json } => cmd::cmd_board(&config, json).await?,
        Commands::Dashboard { recent, json } => cmd::cmd_dashboard(&config, recent, json).await?,
        Commands::Create { fields } => cmd::cmd_create(&config, fields).await?,
        Commands::Update {
            id,
            fields,
            clear_estimate,
        } => cmd::cmd_update(&config, &id, fields, clear_estimate).await?,
        Commands::Move { id, status } => cmd::cmd_move(&config, &id, status).await?,
        Commands::Delete { id } => cmd::cmd_delete(&config, &id).await?,
        Commands::Seed => cmd::cmd_seed(&config).await?,
        Commands::Config => cmd::cmd_config(&config),
    }

    Ok(())
}
