//! Balances tick (spec.md §4.7.5): for each document with provisioned
//! secrets, queries every available port for its balance and atomically
//! replaces the Balances table with a combined, USD-priced view.
//!
//! Ports never compute `usd_value` themselves (see `dw-ports::paper`); this
//! tick fills it in from whatever price snapshot is cached, leaving it blank
//! when no price has been observed yet rather than blocking on a fetch.

use std::sync::Arc;

use dw_schemas::BalanceRow;

use crate::context::TickContext;

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let docs = ctx.repo.list_docs().await?;
    for doc in docs {
        if let Err(e) = balances_one(&ctx, &doc.doc_id).await {
            tracing::warn!(doc_id = %doc.doc_id, error = %e, "balances tick failed for document");
        }
    }
    Ok(())
}

async fn balances_one(ctx: &TickContext, doc_id: &str) -> anyhow::Result<()> {
    let Some(secrets) = ctx.load_secrets(doc_id).await? else {
        // SETUP hasn't run yet (I6): nothing has an address to query.
        return Ok(());
    };

    let mut rows = Vec::new();

    if let Some(port) = &ctx.dispatcher.ports().chain_a {
        push_balance(ctx, "CHAIN_A", port.get_balance(&secrets.chain_a.address).await, &mut rows).await?;
    }

    if let (Some(port), Some(chain_b)) = (&ctx.dispatcher.ports().chain_b, &secrets.chain_b) {
        push_balance(ctx, "CHAIN_B", port.get_balance(&chain_b.address).await, &mut rows).await?;
    }

    if let Some(port) = &ctx.dispatcher.ports().stablecoin {
        push_balance(ctx, "CHAIN_A", port.get_balance(&secrets.chain_a.address).await, &mut rows).await?;
    }

    ctx.document.replace_balances(doc_id, rows).await?;
    Ok(())
}

async fn push_balance(
    ctx: &TickContext,
    chain: &str,
    result: Result<dw_schemas::BalanceEntry, dw_ports::PortError>,
    rows: &mut Vec<BalanceRow>,
) -> anyhow::Result<()> {
    let entry = match result {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(chain, error = %e, "balance query failed");
            return Ok(());
        }
    };

    let pair = format!("{}/USD", entry.asset);
    let usd_value = match ctx.repo.get_price(&pair).await? {
        Some(snapshot) => entry
            .amount
            .parse::<f64>()
            .ok()
            .map(|amount| format!("{:.2}", amount * snapshot.mid))
            .unwrap_or_default(),
        None => String::new(),
    };

    rows.push(BalanceRow {
        asset: entry.asset,
        chain: chain.to_string(),
        amount: entry.amount,
        usd_value,
        updated_at: chrono::Utc::now(),
    });
    Ok(())
}
