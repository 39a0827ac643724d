//! `dw order list` / `dw order cancel` (spec.md §3 ConditionalOrder, §4.7.7).

use anyhow::Result;

use super::connect;

pub async fn list(doc_id: Option<&str>) -> Result<()> {
    let repo = connect().await?;
    let orders = repo.list_active_conditional_orders(doc_id).await?;
    if orders.is_empty() {
        println!("(no active conditional orders)");
        return Ok(());
    }
    for o in orders {
        println!(
            "{} doc={} {:?} {}/{} trigger={} qty={} status={:?}",
            o.order_id, o.doc_id, o.order_type, o.base, o.quote, o.trigger_price, o.qty, o.status
        );
    }
    Ok(())
}

pub async fn cancel(order_id: &str) -> Result<()> {
    let repo = connect().await?;
    repo.cancel_conditional_order(order_id).await?;
    println!("cancelled=true order_id={order_id}");
    Ok(())
}
