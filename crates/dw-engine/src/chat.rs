//! Chat tick (spec.md §4.7.4): turns free-text chat messages into either a
//! queued command (`!execute` prefix) or a suggestion written back to the
//! same row. Never dispatches anything itself — a queued command still
//! waits for approval like any other row.

use std::sync::Arc;

use dw_schemas::{new_id, Command, CommandStatus};

use crate::context::TickContext;
use crate::mirror::{approval_url, audit, command_row};

const EXECUTE_PREFIX: &str = "!execute";

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let docs = ctx.repo.list_docs().await?;
    for doc in docs {
        if let Err(e) = chat_one(&ctx, &doc.doc_id).await {
            tracing::warn!(doc_id = %doc.doc_id, error = %e, "chat tick failed for document");
        }
    }
    Ok(())
}

async fn chat_one(ctx: &TickContext, doc_id: &str) -> anyhow::Result<()> {
    let tables = ctx.document.load_tables(doc_id).await?;
    for (index, row) in tables.chat.iter().enumerate() {
        if row.user.trim().is_empty() || !row.agent.trim().is_empty() {
            continue;
        }
        let reply = build_reply(ctx, doc_id, &row.user).await?;
        ctx.document.set_chat_reply(doc_id, index, &reply).await?;
    }
    Ok(())
}

async fn build_reply(ctx: &TickContext, doc_id: &str, user_message: &str) -> anyhow::Result<String> {
    let trimmed = user_message.trim();
    let (wants_execute, candidate) = match trimmed.strip_prefix(EXECUTE_PREFIX) {
        Some(rest) => (true, rest.trim()),
        None => (false, trimmed),
    };

    let Some(canonical) = dw_parser::try_auto_detect(candidate) else {
        return Ok(format!(
            "Couldn't understand that as a command. Try `DW STATUS` or `{EXECUTE_PREFIX} send 10 USDC to <address>`."
        ));
    };

    if !wants_execute {
        return Ok(format!(
            "Did you mean: `{canonical}`? Prefix with `{EXECUTE_PREFIX}` to queue it for approval."
        ));
    }

    match dw_parser::parse(&canonical) {
        Ok(parsed) => {
            let cmd_id = new_id("cmd");
            let now = chrono::Utc::now();
            let cmd = Command {
                cmd_id: cmd_id.clone(),
                doc_id: doc_id.to_string(),
                raw_command: canonical.clone(),
                parsed_json: Some(serde_json::to_value(&parsed)?),
                status: CommandStatus::PendingApproval,
                tx_ref: None,
                result_text: None,
                error_text: None,
                created_at: now,
                updated_at: now,
            };
            ctx.repo.insert_command(&cmd).await?;
            let url = approval_url(&ctx.config.public_base_url, doc_id, &cmd_id);
            ctx.document
                .append_command_row(doc_id, command_row(&cmd, url))
                .await?;
            audit(ctx, doc_id, format!("{cmd_id} created from chat -> PENDING_APPROVAL")).await?;
            Ok(format!("Queued `{canonical}` for approval ({cmd_id})."))
        }
        Err(e) => Ok(format!("`{canonical}` didn't parse: {}", e.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_prefix_strips_and_lowercases_are_tolerated() {
        let stripped = "!execute DW STATUS".strip_prefix(EXECUTE_PREFIX).unwrap().trim();
        assert_eq!(stripped, "DW STATUS");
    }
}
