use dw_schemas::{ConditionalOrder, ConditionalOrderStatus, ConditionalOrderType};

use crate::{Repo, RepoError};

fn type_from_text(s: &str) -> ConditionalOrderType {
    match s {
        "STOP_LOSS" => ConditionalOrderType::StopLoss,
        "TAKE_PROFIT" => ConditionalOrderType::TakeProfit,
        other => panic!("unknown conditional order type in repository row: {other}"),
    }
}

fn status_from_text(s: &str) -> ConditionalOrderStatus {
    match s {
        "ACTIVE" => ConditionalOrderStatus::Active,
        "TRIGGERED" => ConditionalOrderStatus::Triggered,
        "CANCELLED" => ConditionalOrderStatus::Cancelled,
        other => panic!("unknown conditional order status in repository row: {other}"),
    }
}

type OrderRowTuple = (
    String,
    String,
    String,
    String,
    String,
    f64,
    f64,
    String,
    Option<String>,
);

fn row_to_order(row: OrderRowTuple) -> ConditionalOrder {
    let (order_id, doc_id, order_type, base, quote, trigger_price, qty, status, triggered_cmd_id) = row;
    ConditionalOrder {
        order_id,
        doc_id,
        order_type: type_from_text(&order_type),
        base,
        quote,
        trigger_price,
        qty,
        status: status_from_text(&status),
        triggered_cmd_id,
    }
}

const ORDER_COLUMNS: &str =
    "order_id, doc_id, order_type, base, quote, trigger_price, qty, status, triggered_cmd_id";

impl Repo {
    pub async fn insert_conditional_order(&self, order: &ConditionalOrder) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into conditional_orders (order_id, doc_id, order_type, base, quote, trigger_price, qty, status, triggered_cmd_id)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.doc_id)
        .bind(match order.order_type {
            ConditionalOrderType::StopLoss => "STOP_LOSS",
            ConditionalOrderType::TakeProfit => "TAKE_PROFIT",
        })
        .bind(&order.base)
        .bind(&order.quote)
        .bind(order.trigger_price)
        .bind(order.qty)
        .bind("ACTIVE")
        .bind(&order.triggered_cmd_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Active conditional orders, optionally scoped to one document. Used
    /// by the price tick to evaluate triggers each cycle.
    pub async fn list_active_conditional_orders(
        &self,
        doc_id: Option<&str>,
    ) -> Result<Vec<ConditionalOrder>, RepoError> {
        let rows: Vec<OrderRowTuple> = match doc_id {
            Some(doc_id) => {
                sqlx::query_as(&format!(
                    "select {ORDER_COLUMNS} from conditional_orders where status = 'ACTIVE' and doc_id = $1"
                ))
                .bind(doc_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "select {ORDER_COLUMNS} from conditional_orders where status = 'ACTIVE'"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(row_to_order).collect())
    }

    /// Atomically transitions ACTIVE -> TRIGGERED and records the spawned
    /// command id (I5, P6). The `where status = 'ACTIVE'` clause makes this
    /// a CAS: a losing concurrent caller gets `rows_affected() == 0`.
    pub async fn trigger_conditional_order(
        &self,
        order_id: &str,
        spawned_cmd_id: &str,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "update conditional_orders set status = 'TRIGGERED', triggered_cmd_id = $2 where order_id = $1 and status = 'ACTIVE'",
        )
        .bind(order_id)
        .bind(spawned_cmd_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn cancel_conditional_order(&self, order_id: &str) -> Result<(), RepoError> {
        sqlx::query("update conditional_orders set status = 'CANCELLED' where order_id = $1 and status = 'ACTIVE'")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
