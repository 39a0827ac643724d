//! Poll tick (spec.md §4.7.2): reconciles each tracked document's Commands
//! table against the repository. Skips documents whose `commandsHash` is
//! unchanged since the last poll (P4).
//!
//! Transition-table note (DESIGN.md): spec.md §4.1's table only allows
//! `PENDING_APPROVAL/INVALID -> PENDING_APPROVAL`, never
//! `PENDING_APPROVAL -> INVALID` directly. So an edit to a PENDING_APPROVAL
//! row that fails to re-parse stays at PENDING_APPROVAL with the parse
//! error mirrored into the ERROR cell, rather than moving to INVALID —
//! only a brand-new row (no `cmd_id` yet) can become INVALID directly.

use std::sync::Arc;

use dw_document::commands_hash;
use dw_parser::{has_canonical_prefix, try_auto_detect};
use dw_repo::RepoError;
use dw_schemas::{Command, CommandStatus};

use crate::context::TickContext;
use crate::mirror::{approval_url, audit, command_row};

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let docs = ctx.repo.list_docs().await?;
    for doc in docs {
        match poll_one(&ctx, &doc.doc_id, doc.last_user_hash.as_deref()).await {
            Ok(()) => {
                ctx.repo.reset_poll_failure(&doc.doc_id).await?;
            }
            Err(e) => {
                let failures = ctx.repo.increment_poll_failure(&doc.doc_id).await?;
                tracing::warn!(doc_id = %doc.doc_id, error = %e, failures, "poll failed for document");
                if failures as u32 >= ctx.config.poll_failure_limit {
                    tracing::warn!(doc_id = %doc.doc_id, "poll failure limit reached, dropping document");
                    ctx.repo.remove_doc(&doc.doc_id).await?;
                }
            }
        }
    }
    Ok(())
}

async fn poll_one(ctx: &TickContext, doc_id: &str, last_user_hash: Option<&[u8]>) -> anyhow::Result<()> {
    let tables = ctx.document.load_tables(doc_id).await?;
    let new_hash = commands_hash(&tables.commands);

    if last_user_hash == Some(new_hash.as_slice()) {
        return Ok(());
    }

    for (index, row) in tables.commands.iter().enumerate() {
        if row.raw_command.trim().is_empty() {
            continue;
        }
        if row.cmd_id.trim().is_empty() {
            handle_new_row(ctx, doc_id, index, row).await?;
        } else {
            handle_existing_row(ctx, doc_id, row).await?;
        }
    }

    ctx.repo.set_doc_last_user_hash(doc_id, &new_hash).await?;
    Ok(())
}

async fn handle_new_row(
    ctx: &TickContext,
    doc_id: &str,
    row_index: usize,
    row: &dw_schemas::CommandRow,
) -> anyhow::Result<()> {
    let canonical = canonicalize(&row.raw_command);
    let cmd_id = dw_schemas::new_id("cmd");
    let now = chrono::Utc::now();

    let (status, parsed_json, error_text) = match dw_parser::parse(&canonical) {
        Ok(parsed) => {
            let status = if ctx.config.is_auto_approved(parsed.kind()) {
                CommandStatus::Approved
            } else {
                CommandStatus::PendingApproval
            };
            (status, Some(serde_json::to_value(&parsed)?), None)
        }
        Err(e) => (CommandStatus::Invalid, None, Some(e.message)),
    };

    let cmd = Command {
        cmd_id: cmd_id.clone(),
        doc_id: doc_id.to_string(),
        raw_command: canonical.clone(),
        parsed_json,
        status,
        tx_ref: None,
        result_text: None,
        error_text: error_text.clone(),
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await?;

    let url = approval_url(&ctx.config.public_base_url, doc_id, &cmd_id);
    ctx.document
        .claim_new_row(doc_id, row_index, command_row(&cmd, url))
        .await?;

    if status == CommandStatus::Invalid {
        audit(ctx, doc_id, format!("{cmd_id} INVALID ({})", error_text.unwrap_or_default())).await?;
    } else {
        audit(ctx, doc_id, format!("{cmd_id} created -> {:?}", status)).await?;
    }
    Ok(())
}

async fn handle_existing_row(ctx: &TickContext, doc_id: &str, row: &dw_schemas::CommandRow) -> anyhow::Result<()> {
    let repo_cmd = match ctx.repo.get_command(&row.cmd_id).await? {
        Some(cmd) => cmd,
        None => {
            tracing::warn!(doc_id, cmd_id = %row.cmd_id, "row carries an unknown cmd_id, ignoring until next discovery");
            return Ok(());
        }
    };

    // Cell-edit approval (spec.md §4.7.2 step 3, bullet 1).
    if repo_cmd.status == CommandStatus::PendingApproval {
        let decision = match row.status.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Some(CommandStatus::Approved),
            "REJECTED" => Some(CommandStatus::Rejected),
            _ => None,
        };
        if let Some(to) = decision {
            ctx.repo.set_command_status(&row.cmd_id, to, None, None).await?;
            let url = approval_url(&ctx.config.public_base_url, doc_id, &row.cmd_id);
            let mut updated = repo_cmd.clone();
            updated.status = to;
            ctx.document
                .write_command_row(doc_id, command_row(&updated, url))
                .await?;
            audit(ctx, doc_id, format!("{} {:?} (cell-edit)", row.cmd_id, to)).await?;
            return Ok(());
        }
    }

    // Canonicalize free text before deciding whether anything changed
    // (spec.md §4.7.2 step 3, bullet 2): the COMMAND cell is rewritten in
    // isolation so every other cell is left untouched.
    let canonical = canonicalize(&row.raw_command);
    if canonical != row.raw_command {
        ctx.document.rewrite_command_text(doc_id, &row.cmd_id, &canonical).await?;
    }

    if canonical == repo_cmd.raw_command {
        return Ok(());
    }

    // Raw command edited.
    if repo_cmd.status.is_terminal() {
        let url = approval_url(&ctx.config.public_base_url, doc_id, &row.cmd_id);
        let mut locked = command_row(&repo_cmd, url);
        locked.raw_command = canonical;
        locked.error = "Command locked after approval/execution".to_string();
        ctx.document.write_command_row(doc_id, locked).await?;
        return Ok(());
    }

    match dw_parser::parse(&canonical) {
        Ok(parsed) => {
            let parsed_json = serde_json::to_value(&parsed)?;
            match ctx
                .repo
                .reparse_command(&row.cmd_id, &canonical, Some(parsed_json), CommandStatus::PendingApproval)
                .await
            {
                Ok(()) => {
                    let mut updated = repo_cmd.clone();
                    updated.raw_command = canonical;
                    updated.status = CommandStatus::PendingApproval;
                    updated.error_text = None;
                    let url = approval_url(&ctx.config.public_base_url, doc_id, &row.cmd_id);
                    ctx.document.write_command_row(doc_id, command_row(&updated, url)).await?;
                    audit(ctx, doc_id, format!("{} re-parsed -> PENDING_APPROVAL", row.cmd_id)).await?;
                }
                Err(RepoError::IllegalTransition(msg)) => {
                    let url = approval_url(&ctx.config.public_base_url, doc_id, &row.cmd_id);
                    let mut locked = command_row(&repo_cmd, url);
                    locked.error = msg;
                    ctx.document.write_command_row(doc_id, locked).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) => {
            // Can't move PENDING_APPROVAL straight to INVALID (see module
            // doc comment); surface the parse error but leave the record
            // pending so the user can fix the text.
            let mut updated = repo_cmd.clone();
            updated.raw_command = canonical;
            let url = approval_url(&ctx.config.public_base_url, doc_id, &row.cmd_id);
            let mut cell = command_row(&updated, url);
            cell.error = e.message;
            ctx.document.write_command_row(doc_id, cell).await?;
        }
    }
    Ok(())
}

/// Auto-detects free text into the canonical `DW …` surface (spec.md
/// §4.7.2 step 3, bullet 2). Returns the raw text unchanged if it is
/// already canonical or auto-detect found nothing.
fn canonicalize(raw: &str) -> String {
    if has_canonical_prefix(raw) {
        return raw.to_string();
    }
    match try_auto_detect(raw) {
        Some(canonical) if canonical != raw => canonical,
        _ => raw.to_string(),
    }
}
