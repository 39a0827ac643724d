//! Operator CLI for the docwallet agent. Grounded on `mqk-cli::main`'s
//! clap-derive subcommand tree (`db`, `config-hash`, `run`); here the tree
//! covers the operations an operator actually needs against this engine:
//! database status/migrate, config resolution/hash, and read-only listing
//! of tracked documents, commands, schedules, and conditional orders.
//!
//! This binary never touches the tick scheduler or the HTTP approval
//! surface — those live in `dw-daemon`. It only ever reads/writes through
//! `dw-repo`, the same single source of truth the engine uses.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dw")]
#[command(about = "docwallet-agent operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database connectivity, schema status, and migrations.
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Resolve `DwConfig::from_env()` and print it (master key redacted).
    ConfigShow,

    /// Load + deep-merge layered YAML config files and print the canonical
    /// JSON plus its hash (mirrors `mqk-cli`'s `config-hash`).
    ConfigHash {
        /// Paths in merge order (base -> env -> per-deploy).
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Document listing and inspection.
    Doc {
        #[command(subcommand)]
        cmd: DocCmd,
    },

    /// Command listing and inspection.
    Cmd {
        #[command(subcommand)]
        cmd: CmdCmd,
    },

    /// Schedule listing and cancellation.
    Schedule {
        #[command(subcommand)]
        cmd: ScheduleCmd,
    },

    /// Conditional-order listing and cancellation.
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema-presence check.
    Status,
    /// Apply embedded migrations.
    Migrate,
}

#[derive(Subcommand)]
enum DocCmd {
    /// List every tracked document.
    List,
    /// Show one document's recent audit trail.
    Audit {
        doc_id: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum CmdCmd {
    /// Show one command's full record.
    Show { cmd_id: String },
    /// List the most recent commands for a document.
    Recent {
        doc_id: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ScheduleCmd {
    /// Show one schedule.
    Show { schedule_id: String },
    /// Cancel a schedule.
    Cancel { schedule_id: String },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// List active conditional orders, optionally scoped to one document.
    List {
        #[arg(long)]
        doc_id: Option<String>,
    },
    /// Cancel a conditional order.
    Cancel { order_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => commands::db::status().await,
            DbCmd::Migrate => commands::db::migrate().await,
        },
        Commands::ConfigShow => commands::config::show(),
        Commands::ConfigHash { paths } => commands::config::hash(&paths),
        Commands::Doc { cmd } => match cmd {
            DocCmd::List => commands::doc::list().await,
            DocCmd::Audit { doc_id, limit } => commands::doc::audit(&doc_id, limit).await,
        },
        Commands::Cmd { cmd } => match cmd {
            CmdCmd::Show { cmd_id } => commands::cmd::show(&cmd_id).await,
            CmdCmd::Recent { doc_id, limit } => commands::cmd::recent(&doc_id, limit).await,
        },
        Commands::Schedule { cmd } => match cmd {
            ScheduleCmd::Show { schedule_id } => commands::schedule::show(&schedule_id).await,
            ScheduleCmd::Cancel { schedule_id } => commands::schedule::cancel(&schedule_id).await,
        },
        Commands::Order { cmd } => match cmd {
            OrderCmd::List { doc_id } => commands::order::list(doc_id.as_deref()).await,
            OrderCmd::Cancel { order_id } => commands::order::cancel(&order_id).await,
        },
    }
}

