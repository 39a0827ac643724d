//! Payout-rules tick (spec.md §4.7.9): the optional standing-payment table.
//! Due rules execute a transfer through the same dispatcher path as a
//! user-typed `DW PAYOUT`, then write back `next_run`/`last_tx`/`status`
//! whether the attempt succeeded or failed — a broken rule still advances
//! so it doesn't retry every tick forever (see `dw_repo::advance_payout_rule`).

use std::sync::Arc;

use dw_schemas::ParsedCommand;

use crate::context::TickContext;
use crate::mirror::{audit, record_activity};

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let due = ctx.repo.list_due_payout_rules(chrono::Utc::now()).await?;
    for rule in due {
        if let Err(e) = run_one(&ctx, &rule).await {
            tracing::warn!(rule_id = %rule.rule_id, error = %e, "payout-rules tick failed on rule");
        }
    }
    Ok(())
}

async fn run_one(ctx: &TickContext, rule: &dw_schemas::PayoutRule) -> anyhow::Result<()> {
    let next_run_at = rule.next_run_at + chrono::Duration::hours(rule.interval_hours as i64);

    if rule.recipient.trim().is_empty() || rule.amount.parse::<f64>().map(|a| a <= 0.0).unwrap_or(true) {
        ctx.repo.cancel_payout_rule(&rule.rule_id).await?;
        audit(
            ctx,
            &rule.doc_id,
            format!("payout rule {} cancelled: invalid recipient or amount", rule.rule_id),
        )
        .await?;
        write_row(ctx, rule, "CANCELLED", rule.last_tx.clone(), rule.next_run_at).await?;
        return Ok(());
    }

    let Some(secrets) = ctx.load_secrets(&rule.doc_id).await? else {
        // SETUP hasn't run yet; leave the rule due so it retries once secrets exist.
        return Ok(());
    };

    let parsed = ParsedCommand::Payout {
        asset: rule.asset.clone(),
        amount: rule.amount.clone(),
        to: rule.recipient.clone(),
    };

    let last_tx = match ctx.dispatcher.dispatch(&rule.doc_id, &parsed, &secrets, ctx.config.demo_mode).await {
        Ok(outcome) => {
            audit(ctx, &rule.doc_id, format!("payout rule {} paid: {}", rule.rule_id, outcome.result_text)).await?;
            record_activity(ctx, &rule.doc_id, "PAYOUT_RULE", outcome.result_text, outcome.tx_ref.clone()).await?;
            outcome.tx_ref.or_else(|| rule.last_tx.clone())
        }
        Err(e) => {
            audit(ctx, &rule.doc_id, format!("payout rule {} failed: {e}", rule.rule_id)).await?;
            rule.last_tx.clone()
        }
    };

    ctx.repo.advance_payout_rule(&rule.rule_id, next_run_at, last_tx.as_deref()).await?;
    write_row(ctx, rule, "ACTIVE", last_tx, next_run_at).await?;
    Ok(())
}

async fn write_row(
    ctx: &TickContext,
    rule: &dw_schemas::PayoutRule,
    status: &str,
    last_tx: Option<String>,
    next_run_at: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<()> {
    ctx.document
        .write_payout_rule_row(
            &rule.doc_id,
            dw_schemas::PayoutRuleRow {
                rule_id: rule.rule_id.clone(),
                recipient: rule.recipient.clone(),
                asset: rule.asset.clone(),
                amount: rule.amount.clone(),
                interval_hours: rule.interval_hours.to_string(),
                next_run_at,
                last_tx: last_tx.unwrap_or_default(),
                status: status.to_string(),
            },
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn invalid_amount_is_rejected() {
        assert!("0".parse::<f64>().map(|a| a <= 0.0).unwrap_or(true));
        assert!("-5".parse::<f64>().map(|a| a <= 0.0).unwrap_or(true));
        assert!(!"12.5".parse::<f64>().map(|a| a <= 0.0).unwrap_or(true));
    }
}
