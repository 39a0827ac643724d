//! `dw schedule show` / `dw schedule cancel` (spec.md §3 Schedule, §4.7.6).

use anyhow::{bail, Result};

use super::connect;

pub async fn show(schedule_id: &str) -> Result<()> {
    let repo = connect().await?;
    let Some(s) = repo.get_schedule(schedule_id).await? else {
        bail!("no schedule with schedule_id={schedule_id}");
    };
    println!("schedule_id={}", s.schedule_id);
    println!("doc_id={}", s.doc_id);
    println!("status={:?}", s.status);
    println!("interval_hours={}", s.interval_hours);
    println!("inner_command_text={}", s.inner_command_text);
    println!("next_run_at={}", s.next_run_at.to_rfc3339());
    println!("total_runs={}", s.total_runs);
    Ok(())
}

pub async fn cancel(schedule_id: &str) -> Result<()> {
    let repo = connect().await?;
    repo.cancel_schedule(schedule_id).await?;
    println!("cancelled=true schedule_id={schedule_id}");
    Ok(())
}
