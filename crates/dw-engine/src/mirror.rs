//! Small helpers shared by every tick that needs to mirror repository state
//! back onto document cells, or append to the Audit/RecentActivity tables
//! (spec.md §7 "User-visible surface"). Kept here instead of duplicated in
//! each tick module.

use chrono::Utc;
use dw_schemas::{AuditEvent, AuditRow, Command, CommandRow, RecentActivity, RecentActivityRow};

use crate::context::TickContext;

pub fn approval_url(base: &str, doc_id: &str, cmd_id: &str) -> String {
    format!("{}/cmd/{doc_id}/{cmd_id}", base.trim_end_matches('/'))
}

/// Builds the six-column Commands row spec.md §6 mirrors for one command.
pub fn command_row(cmd: &Command, approval_url: String) -> CommandRow {
    CommandRow {
        cmd_id: cmd.cmd_id.clone(),
        raw_command: cmd.raw_command.clone(),
        status: cmd.status.as_cell_text().to_string(),
        approval_url,
        result: cmd.result_text.clone().unwrap_or_default(),
        error: cmd.error_text.clone().unwrap_or_default(),
    }
}

/// Appends one line to both the durable audit log and the document's Audit
/// table (spec.md §7: every failure/decision produces an audit line).
pub async fn audit(ctx: &TickContext, doc_id: &str, message: impl Into<String>) -> anyhow::Result<()> {
    let timestamp = Utc::now();
    let message = message.into();
    ctx.repo
        .insert_audit_event(&AuditEvent {
            doc_id: doc_id.to_string(),
            timestamp,
            message: message.clone(),
        })
        .await?;
    ctx.document
        .append_audit_row(doc_id, AuditRow { timestamp, message })
        .await?;
    Ok(())
}

/// Records one executed command in RecentActivity, both durably and on the
/// document (spec.md §4.7.3 step 3, §3).
pub async fn record_activity(
    ctx: &TickContext,
    doc_id: &str,
    activity_type: &str,
    details: impl Into<String>,
    tx_ref: Option<String>,
) -> anyhow::Result<()> {
    let timestamp = Utc::now();
    let details = details.into();
    ctx.repo
        .insert_recent_activity(&RecentActivity {
            doc_id: doc_id.to_string(),
            timestamp,
            activity_type: activity_type.to_string(),
            details: details.clone(),
            tx_ref: tx_ref.clone(),
        })
        .await?;
    ctx.document
        .append_recent_activity_row(
            doc_id,
            RecentActivityRow {
                timestamp,
                activity_type: activity_type.to_string(),
                details,
                tx_ref: tx_ref.unwrap_or_default(),
            },
        )
        .await?;
    Ok(())
}
