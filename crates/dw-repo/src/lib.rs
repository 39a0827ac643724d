//! Durable repository (spec.md §4.1): the single source of truth for
//! command/schedule/conditional-order state. Modeled on `mqk-db`'s
//! connect/migrate/plain-query style — raw `sqlx::query`/`query_as` calls
//! rather than the compile-time-checked `query!` macros, since this crate
//! has no fixed database available at build time.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub mod agent;
pub mod audit;
pub mod commands;
pub mod conditional_orders;
pub mod config;
pub mod docs;
pub mod error;
pub mod payout_rules;
pub mod prices;
pub mod schedules;
pub mod secrets;

pub use error::RepoError;

pub const ENV_DB_URL: &str = "DOCWALLET_DATABASE_URL";

/// Connects to Postgres using [`ENV_DB_URL`].
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Runs the embedded migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Test helper: connect + migrate in one call.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Typed handle over the connection pool. All operations in §4.1 are
/// methods on this type, split across the sibling modules by entity.
#[derive(Clone)]
pub struct Repo {
    pool: PgPool,
}

impl Repo {
    pub fn new(pool: PgPool) -> Repo {
        Repo { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connectivity + schema presence check, surfaced on `GET /api/status`.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1 from information_schema.tables
            where table_schema = 'public' and table_name = 'documents'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_schema: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_schema: bool,
}
