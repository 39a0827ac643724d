pub mod cmd;
pub mod config;
pub mod db;
pub mod doc;
pub mod order;
pub mod schedule;

use anyhow::{Context, Result};
use dw_repo::Repo;

/// Every subcommand connects fresh rather than threading a pool through
/// `Cli` — this binary is a one-shot process per invocation, not a
/// long-lived server like `dw-daemon`.
pub(crate) async fn connect() -> Result<Repo> {
    let pool = dw_repo::connect_from_env().await.context("connect to Postgres")?;
    Ok(Repo::new(pool))
}
