//! Agent-decision tick (spec.md §4.7.8): heuristics that may enqueue
//! PENDING_APPROVAL auto-proposals, plus alerts persisted as audit/activity
//! rows. Never executes anything itself — a proposal is just another
//! Commands row, subject to the same approval pipeline as a user-typed one.
//!
//! Every proposal and alert is keyed by a stable `proposal_key` and gated by
//! [`dw_repo::Repo::get_proposal_cooldown`]/`mark_proposal_fired` so a
//! standing condition (low gas, a breached threshold) doesn't re-fire every
//! tick; `COOLDOWN` is deliberately coarse since these are advisory, not
//! safety-critical.

use std::sync::Arc;

use dw_schemas::{new_id, Command, CommandStatus};

use crate::context::TickContext;
use crate::mirror::{audit, record_activity};

const COOLDOWN: chrono::Duration = chrono::Duration::hours(6);
const LOW_GAS_THRESHOLD: f64 = 1.0;
const SPREAD_ALERT_RATIO: f64 = 0.05;

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let docs = ctx.repo.list_docs().await?;
    for doc in docs {
        if let Err(e) = decide_one(&ctx, &doc.doc_id).await {
            tracing::warn!(doc_id = %doc.doc_id, error = %e, "agent-decision tick failed for document");
        }
    }
    Ok(())
}

async fn decide_one(ctx: &TickContext, doc_id: &str) -> anyhow::Result<()> {
    let tables = ctx.document.load_tables(doc_id).await?;

    low_gas_alert(ctx, doc_id, &tables).await?;
    threshold_breach_alerts(ctx, doc_id, &tables).await?;
    stale_commands_alert(ctx, doc_id).await?;
    spread_volatility_alerts(ctx, doc_id, &tables).await?;
    auto_rebalance_proposal(ctx, doc_id, &tables).await?;

    Ok(())
}

/// Fires at most once per [`COOLDOWN`] per `(doc_id, proposal_key)`.
async fn fire_if_due(ctx: &TickContext, doc_id: &str, proposal_key: &str, message: String) -> anyhow::Result<bool> {
    let now = chrono::Utc::now();
    if let Some(last) = ctx.repo.get_proposal_cooldown(doc_id, proposal_key).await? {
        if now - last < COOLDOWN {
            return Ok(false);
        }
    }
    audit(ctx, doc_id, message.clone()).await?;
    record_activity(ctx, doc_id, "ALERT", message, None).await?;
    ctx.repo.mark_proposal_fired(doc_id, proposal_key, now).await?;
    Ok(true)
}

async fn low_gas_alert(ctx: &TickContext, doc_id: &str, tables: &dw_schemas::DocumentTables) -> anyhow::Result<()> {
    for row in &tables.balances {
        if row.chain != "CHAIN_A" && row.chain != "CHAIN_B" {
            continue;
        }
        let Ok(amount) = row.amount.parse::<f64>() else { continue };
        if amount >= LOW_GAS_THRESHOLD {
            continue;
        }
        fire_if_due(
            ctx,
            doc_id,
            &format!("low_gas:{}", row.chain),
            format!("low gas on {}: {} {} remaining (below {LOW_GAS_THRESHOLD})", row.chain, row.amount, row.asset),
        )
        .await?;
    }
    Ok(())
}

async fn threshold_breach_alerts(
    ctx: &TickContext,
    doc_id: &str,
    tables: &dw_schemas::DocumentTables,
) -> anyhow::Result<()> {
    let configured = ctx.repo.list_doc_config(doc_id).await?;
    for entry in configured {
        let Some(coin) = entry.key.strip_prefix("alert_threshold:") else { continue };
        let Ok(threshold) = entry.value.parse::<f64>() else { continue };
        let Some(row) = tables.balances.iter().find(|b| b.asset == coin) else { continue };
        let Ok(amount) = row.amount.parse::<f64>() else { continue };
        if amount >= threshold {
            continue;
        }
        fire_if_due(
            ctx,
            doc_id,
            &format!("threshold:{coin}"),
            format!("{coin} balance {amount} is below the configured alert threshold {threshold}"),
        )
        .await?;
    }
    Ok(())
}

async fn stale_commands_alert(ctx: &TickContext, doc_id: &str) -> anyhow::Result<()> {
    let recent = ctx.repo.list_recent_commands(doc_id, 20).await?;
    let stale_count = recent
        .iter()
        .filter(|c| c.status == dw_schemas::CommandStatus::Failed && c.error_text.as_deref() == Some("stale"))
        .count();
    if stale_count == 0 {
        return Ok(());
    }
    fire_if_due(
        ctx,
        doc_id,
        "stale_commands",
        format!("{stale_count} recent command(s) failed as stale; approvals may be arriving too slowly"),
    )
    .await?;
    Ok(())
}

async fn spread_volatility_alerts(
    ctx: &TickContext,
    doc_id: &str,
    _tables: &dw_schemas::DocumentTables,
) -> anyhow::Result<()> {
    let orders = ctx.repo.list_active_conditional_orders(Some(doc_id)).await?;
    let mut seen = std::collections::BTreeSet::new();
    for order in orders {
        let pair = format!("{}/{}", order.base, order.quote);
        if !seen.insert(pair.clone()) {
            continue;
        }
        let Some(snapshot) = ctx.repo.get_price(&pair).await? else { continue };
        if snapshot.mid <= 0.0 {
            continue;
        }
        let spread_ratio = (snapshot.ask - snapshot.bid) / snapshot.mid;
        if spread_ratio < SPREAD_ALERT_RATIO {
            continue;
        }
        fire_if_due(
            ctx,
            doc_id,
            &format!("spread:{pair}"),
            format!("{pair} spread is {:.1}% of mid, above the {:.0}% volatility alert band", spread_ratio * 100.0, SPREAD_ALERT_RATIO * 100.0),
        )
        .await?;
    }
    Ok(())
}

/// Proposes a REBALANCE command when AUTO_REBALANCE is ON and the two
/// chain balances have drifted more than 2x apart. Deduplicated against any
/// non-terminal REBALANCE command already queued for this document.
async fn auto_rebalance_proposal(
    ctx: &TickContext,
    doc_id: &str,
    tables: &dw_schemas::DocumentTables,
) -> anyhow::Result<()> {
    if ctx.repo.get_doc_config(doc_id, "auto_rebalance").await?.as_deref() != Some("ON") {
        return Ok(());
    }

    let chain_a = tables.balances.iter().find(|b| b.chain == "CHAIN_A").and_then(|b| b.amount.parse::<f64>().ok());
    let chain_b = tables.balances.iter().find(|b| b.chain == "CHAIN_B").and_then(|b| b.amount.parse::<f64>().ok());
    let (Some(a), Some(b)) = (chain_a, chain_b) else { return Ok(()) };
    if a <= 0.0 || b <= 0.0 {
        return Ok(());
    }
    let ratio = (a / b).max(b / a);
    if ratio < 2.0 {
        return Ok(());
    }

    let recent = ctx.repo.list_recent_commands(doc_id, 20).await?;
    let already_queued = recent.iter().any(|c| {
        !c.status.is_terminal() && c.raw_command.eq_ignore_ascii_case("DW REBALANCE")
    });
    if already_queued {
        return Ok(());
    }

    let now = chrono::Utc::now();
    if let Some(last) = ctx.repo.get_proposal_cooldown(doc_id, "auto_rebalance_proposal").await? {
        if now - last < COOLDOWN {
            return Ok(());
        }
    }

    let cmd_id = new_id("cmd");
    let parsed = dw_schemas::ParsedCommand::Rebalance;
    let cmd = Command {
        cmd_id: cmd_id.clone(),
        doc_id: doc_id.to_string(),
        raw_command: "DW REBALANCE".to_string(),
        parsed_json: Some(serde_json::to_value(&parsed)?),
        status: CommandStatus::PendingApproval,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await?;
    let url = crate::mirror::approval_url(&ctx.config.public_base_url, doc_id, &cmd_id);
    ctx.document
        .append_command_row(doc_id, crate::mirror::command_row(&cmd, url))
        .await?;
    audit(ctx, doc_id, format!("proposed {cmd_id} (auto-rebalance: chain balances diverged {ratio:.1}x)")).await?;
    ctx.repo.mark_proposal_fired(doc_id, "auto_rebalance_proposal", now).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_ratio_is_relative_to_mid() {
        let mid = 100.0_f64;
        let bid = 95.0_f64;
        let ask = 105.0_f64;
        let ratio = (ask - bid) / mid;
        assert!((ratio - 0.10).abs() < 1e-9);
    }

    #[test]
    fn rebalance_ratio_triggers_only_past_2x() {
        assert!((3.0_f64 / 1.0_f64).max(1.0_f64 / 3.0_f64) >= 2.0);
        assert!(!((1.5_f64 / 1.0_f64).max(1.0_f64 / 1.5_f64) >= 2.0));
    }
}
