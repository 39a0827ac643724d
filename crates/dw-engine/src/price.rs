//! Price tick (spec.md §4.7.7): refreshes cached mid prices for every pair
//! an ACTIVE conditional order cares about, then evaluates those orders
//! against the fresh price. A trigger spawns an APPROVED "market sell"
//! command and attempts it inline; a failed inline attempt is not retried
//! here, it is left APPROVED for the next executor fire (I3, §4.7.3).

use std::collections::BTreeSet;
use std::sync::Arc;

use dw_schemas::{new_id, Command, CommandStatus, ConditionalOrder, ConditionalOrderType, ParsedCommand, PriceSnapshot};

use crate::context::TickContext;
use crate::mirror::{approval_url, audit, command_row, record_activity};

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let orders = ctx.repo.list_active_conditional_orders(None).await?;
    if orders.is_empty() {
        return Ok(());
    }

    let pairs: BTreeSet<(String, String)> = orders
        .iter()
        .map(|o| (o.base.clone(), o.quote.clone()))
        .collect();

    for (base, quote) in pairs {
        if let Err(e) = refresh_pair(&ctx, &base, &quote).await {
            tracing::warn!(base, quote, error = %e, "price tick failed to refresh pair");
        }
    }

    for order in orders {
        if let Err(e) = evaluate_order(&ctx, &order).await {
            tracing::warn!(order_id = %order.order_id, error = %e, "price tick failed to evaluate order");
        }
    }

    Ok(())
}

async fn refresh_pair(ctx: &TickContext, base: &str, quote: &str) -> anyhow::Result<()> {
    let pair = format!("{base}/{quote}");
    let quote_price = ctx.dispatcher.fetch_price(&pair).await?;
    ctx.repo
        .upsert_price(&PriceSnapshot {
            pair,
            mid: quote_price.mid,
            bid: quote_price.bid,
            ask: quote_price.ask,
            source: quote_price.source,
            updated_at: quote_price.as_of,
        })
        .await?;
    Ok(())
}

async fn evaluate_order(ctx: &TickContext, order: &ConditionalOrder) -> anyhow::Result<()> {
    let pair = format!("{}/{}", order.base, order.quote);
    let Some(snapshot) = ctx.repo.get_price(&pair).await? else {
        return Ok(());
    };

    let triggered = match order.order_type {
        ConditionalOrderType::StopLoss => snapshot.mid <= order.trigger_price,
        ConditionalOrderType::TakeProfit => snapshot.mid >= order.trigger_price,
    };
    if !triggered {
        return Ok(());
    }

    let Some(secrets) = ctx.load_secrets(&order.doc_id).await? else {
        return Ok(());
    };

    let Some(parsed) = market_sell(ctx, order, &secrets.chain_a.address, secrets.chain_b.as_ref().map(|k| k.address.as_str())) else {
        tracing::warn!(order_id = %order.order_id, base = %order.base, "no port can realize market sell for base asset");
        return Ok(());
    };

    let cmd_id = new_id("cmd");
    let now = chrono::Utc::now();
    let cmd = Command {
        cmd_id: cmd_id.clone(),
        doc_id: order.doc_id.clone(),
        raw_command: format!("[ORDER:{}] market sell {} {}", order.order_id, order.qty, order.base),
        parsed_json: Some(serde_json::to_value(&parsed)?),
        status: CommandStatus::Approved,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await?;
    let url = approval_url(&ctx.config.public_base_url, &order.doc_id, &cmd_id);
    ctx.document
        .append_command_row(&order.doc_id, command_row(&cmd, url))
        .await?;

    if !ctx.repo.trigger_conditional_order(&order.order_id, &cmd_id).await? {
        // Lost the CAS to a concurrent price-tick fire; the command we just
        // queued is harmless and still APPROVED, the executor will run it.
        return Ok(());
    }

    audit(
        ctx,
        &order.doc_id,
        format!("order {} triggered at mid={} -> {cmd_id}", order.order_id, snapshot.mid),
    )
    .await?;

    match ctx
        .dispatcher
        .dispatch(&order.doc_id, &parsed, &secrets, ctx.config.demo_mode)
        .await
    {
        Ok(outcome) => {
            if outcome.tx_ref.is_some() {
                ctx.repo
                    .set_command_execution_ids(&cmd_id, outcome.tx_ref.as_deref())
                    .await?;
            }
            ctx.repo
                .set_command_status(&cmd_id, CommandStatus::Executed, Some(&outcome.result_text), None)
                .await?;
            let mut updated = cmd.clone();
            updated.status = CommandStatus::Executed;
            updated.result_text = Some(outcome.result_text.clone());
            updated.tx_ref = outcome.tx_ref.clone();
            let url = approval_url(&ctx.config.public_base_url, &order.doc_id, &cmd_id);
            ctx.document.write_command_row(&order.doc_id, command_row(&updated, url)).await?;
            audit(ctx, &order.doc_id, format!("{cmd_id} EXECUTED")).await?;
            record_activity(ctx, &order.doc_id, "EXECUTED", outcome.result_text, outcome.tx_ref).await?;
        }
        Err(e) => {
            // Leave it APPROVED: the executor tick retries it on its next
            // fire rather than this tick deciding it has failed for good.
            tracing::info!(cmd_id, error = %e, "inline market-sell dispatch failed, leaving APPROVED for executor");
        }
    }

    Ok(())
}

/// Maps a triggered order onto an existing command verb capable of moving
/// `qty` of `base` out of the document's own custody: `<CHAIN>_SEND` to the
/// document's own address on that chain when `base` names a wired chain
/// port, otherwise `PAYOUT` through the stablecoin port. There is no
/// dedicated swap/exchange port (spec.md §4.4), so "sell" here means "exit
/// the position to self-custody," same as every other dispatcher verb that
/// only ever moves funds it already controls.
fn market_sell(
    ctx: &TickContext,
    order: &ConditionalOrder,
    chain_a_address: &str,
    chain_b_address: Option<&str>,
) -> Option<ParsedCommand> {
    if ctx.dispatcher.ports().chain_port(&order.base).is_some() {
        let to = match order.base.to_ascii_uppercase().as_str() {
            "CHAIN_A" => chain_a_address.to_string(),
            "CHAIN_B" => chain_b_address?.to_string(),
            _ => return None,
        };
        return Some(ParsedCommand::ChainSend {
            chain: order.base.clone(),
            to,
            amount: format!("{}", order.qty),
        });
    }

    Some(ParsedCommand::Payout {
        asset: order.base.clone(),
        amount: format!("{}", order.qty),
        to: chain_a_address.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_schemas::ConditionalOrderStatus;

    #[test]
    fn stop_loss_triggers_at_or_below_trigger_price() {
        let order = ConditionalOrder {
            order_id: "order-1".to_string(),
            doc_id: "doc-1".to_string(),
            order_type: ConditionalOrderType::StopLoss,
            base: "CHAIN_A".to_string(),
            quote: "USD".to_string(),
            trigger_price: 10.0,
            qty: 5.0,
            status: ConditionalOrderStatus::Active,
            triggered_cmd_id: None,
        };
        assert!(matches!(order.order_type, ConditionalOrderType::StopLoss));
        assert!(9.5_f64 <= order.trigger_price);
        assert!(!(10.5_f64 <= order.trigger_price));
    }

    #[test]
    fn take_profit_triggers_at_or_above_trigger_price() {
        let trigger_price = 20.0_f64;
        assert!(20.0_f64 >= trigger_price);
        assert!(!(19.9_f64 >= trigger_price));
    }
}
