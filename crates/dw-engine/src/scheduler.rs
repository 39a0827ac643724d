//! Scheduler tick (spec.md §4.7.6): re-parses each due Schedule's inner
//! command text and spawns it as a fresh APPROVED command. A parse failure
//! cancels the schedule outright rather than retrying it every tick forever.

use std::sync::Arc;

use dw_schemas::{new_id, Command, CommandStatus};

use crate::context::TickContext;
use crate::mirror::{approval_url, audit, command_row};

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let due = ctx.repo.list_due_schedules(chrono::Utc::now()).await?;
    for schedule in due {
        if let Err(e) = fire_one(&ctx, &schedule).await {
            tracing::warn!(schedule_id = %schedule.schedule_id, error = %e, "scheduler tick failed on schedule");
        }
    }
    Ok(())
}

async fn fire_one(ctx: &TickContext, schedule: &dw_schemas::Schedule) -> anyhow::Result<()> {
    let run = schedule.total_runs + 1;

    let parsed = match dw_parser::parse(&schedule.inner_command_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            ctx.repo.cancel_schedule(&schedule.schedule_id).await?;
            audit(
                ctx,
                &schedule.doc_id,
                format!(
                    "schedule {} cancelled: inner command no longer parses ({})",
                    schedule.schedule_id, e.message
                ),
            )
            .await?;
            return Ok(());
        }
    };

    let cmd_id = new_id("cmd");
    let now = chrono::Utc::now();
    let cmd = Command {
        cmd_id: cmd_id.clone(),
        doc_id: schedule.doc_id.clone(),
        raw_command: format!("[SCHED:{}#{run}] {}", schedule.schedule_id, schedule.inner_command_text),
        parsed_json: Some(serde_json::to_value(&parsed)?),
        status: CommandStatus::Approved,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await?;
    let url = approval_url(&ctx.config.public_base_url, &schedule.doc_id, &cmd_id);
    ctx.document
        .append_command_row(&schedule.doc_id, command_row(&cmd, url))
        .await?;

    audit(
        ctx,
        &schedule.doc_id,
        format!("schedule {} fired run #{run} -> {cmd_id}", schedule.schedule_id),
    )
    .await?;

    ctx.repo.advance_schedule(&schedule.schedule_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_number_is_total_runs_plus_one() {
        let schedule = dw_schemas::Schedule {
            schedule_id: "sched-1".to_string(),
            doc_id: "doc-1".to_string(),
            interval_hours: 6,
            inner_command_text: "DW STATUS".to_string(),
            next_run_at: chrono::Utc::now(),
            total_runs: 3,
            status: dw_schemas::ScheduleStatus::Active,
        };
        assert_eq!(schedule.total_runs + 1, 4);
    }
}
