//! `dw cmd show` / `dw cmd recent` — read-only Command record inspection,
//! the same records the executor tick transitions (spec.md §4.1).

use anyhow::{bail, Result};

use super::connect;

pub async fn show(cmd_id: &str) -> Result<()> {
    let repo = connect().await?;
    let Some(cmd) = repo.get_command(cmd_id).await? else {
        bail!("no command with cmd_id={cmd_id}");
    };
    println!("cmd_id={}", cmd.cmd_id);
    println!("doc_id={}", cmd.doc_id);
    println!("status={:?}", cmd.status);
    println!("raw_command={}", cmd.raw_command);
    println!("tx_ref={}", cmd.tx_ref.as_deref().unwrap_or("-"));
    println!("result_text={}", cmd.result_text.as_deref().unwrap_or("-"));
    println!("error_text={}", cmd.error_text.as_deref().unwrap_or("-"));
    println!("created_at={}", cmd.created_at.to_rfc3339());
    println!("updated_at={}", cmd.updated_at.to_rfc3339());
    Ok(())
}

pub async fn recent(doc_id: &str, limit: i64) -> Result<()> {
    let repo = connect().await?;
    let cmds = repo.list_recent_commands(doc_id, limit).await?;
    if cmds.is_empty() {
        println!("(no commands for {doc_id})");
        return Ok(());
    }
    for c in cmds {
        println!(
            "{} {:?} {} -> {}",
            c.cmd_id,
            c.status,
            c.raw_command,
            c.result_text.or(c.error_text).unwrap_or_default()
        );
    }
    Ok(())
}
