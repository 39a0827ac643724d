use chrono::{DateTime, Utc};
use dw_schemas::PriceSnapshot;

use crate::{Repo, RepoError};

impl Repo {
    pub async fn upsert_price(&self, price: &PriceSnapshot) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into prices (pair, mid, bid, ask, source, updated_at)
            values ($1, $2, $3, $4, $5, $6)
            on conflict (pair) do update set
              mid = excluded.mid, bid = excluded.bid, ask = excluded.ask,
              source = excluded.source, updated_at = excluded.updated_at
            "#,
        )
        .bind(&price.pair)
        .bind(price.mid)
        .bind(price.bid)
        .bind(price.ask)
        .bind(&price.source)
        .bind(price.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_price(&self, pair: &str) -> Result<Option<PriceSnapshot>, RepoError> {
        let row: Option<(String, f64, f64, f64, String, DateTime<Utc>)> = sqlx::query_as(
            "select pair, mid, bid, ask, source, updated_at from prices where pair = $1",
        )
        .bind(pair)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(pair, mid, bid, ask, source, updated_at)| PriceSnapshot {
            pair,
            mid,
            bid,
            ask,
            source,
            updated_at,
        }))
    }
}
