//! `dw doc list` / `dw doc audit` — read-only document inspection.

use anyhow::Result;

use super::connect;

pub async fn list() -> Result<()> {
    let repo = connect().await?;
    let docs = repo.list_docs().await?;
    if docs.is_empty() {
        println!("(no tracked documents)");
        return Ok(());
    }
    for d in docs {
        println!(
            "doc_id={} name={:?} primary={} secondary={} poll_failures={}",
            d.doc_id,
            d.display_name,
            d.primary_address.as_deref().unwrap_or("-"),
            d.secondary_address.as_deref().unwrap_or("-"),
            d.poll_failure_count,
        );
    }
    Ok(())
}

pub async fn audit(doc_id: &str, limit: i64) -> Result<()> {
    let repo = connect().await?;
    let events = repo.list_audit_events(doc_id, limit).await?;
    if events.is_empty() {
        println!("(no audit events for {doc_id})");
        return Ok(());
    }
    for e in events {
        println!("[{}] {}", e.timestamp.to_rfc3339(), e.message);
    }
    Ok(())
}
