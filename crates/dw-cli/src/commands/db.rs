//! `dw db status` / `dw db migrate` — mirrors `mqk-cli`'s `db status`/`db migrate`.

use anyhow::Result;

pub async fn status() -> Result<()> {
    let pool = dw_repo::connect_from_env().await?;
    let s = dw_repo::status(&pool).await?;
    println!("db_ok={} has_schema={}", s.ok, s.has_schema);
    Ok(())
}

pub async fn migrate() -> Result<()> {
    let pool = dw_repo::connect_from_env().await?;
    dw_repo::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}
