use chrono::{DateTime, Utc};
use dw_schemas::{PayoutRule, PayoutRuleStatus};

use crate::{Repo, RepoError};

fn status_from_text(s: &str) -> PayoutRuleStatus {
    match s {
        "ACTIVE" => PayoutRuleStatus::Active,
        "CANCELLED" => PayoutRuleStatus::Cancelled,
        other => panic!("unknown payout rule status in repository row: {other}"),
    }
}

type PayoutRuleRowTuple = (
    String,
    String,
    String,
    String,
    String,
    i32,
    DateTime<Utc>,
    Option<String>,
    String,
);

fn row_to_payout_rule(row: PayoutRuleRowTuple) -> PayoutRule {
    let (rule_id, doc_id, recipient, asset, amount, interval_hours, next_run_at, last_tx, status) = row;
    PayoutRule {
        rule_id,
        doc_id,
        recipient,
        asset,
        amount,
        interval_hours,
        next_run_at,
        last_tx,
        status: status_from_text(&status),
    }
}

const PAYOUT_RULE_COLUMNS: &str =
    "rule_id, doc_id, recipient, asset, amount, interval_hours, next_run_at, last_tx, status";

impl Repo {
    pub async fn insert_payout_rule(&self, rule: &PayoutRule) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into payout_rules (rule_id, doc_id, recipient, asset, amount, interval_hours, next_run_at, last_tx, status)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&rule.rule_id)
        .bind(&rule.doc_id)
        .bind(&rule.recipient)
        .bind(&rule.asset)
        .bind(&rule.amount)
        .bind(rule.interval_hours)
        .bind(rule.next_run_at)
        .bind(&rule.last_tx)
        .bind(match rule.status {
            PayoutRuleStatus::Active => "ACTIVE",
            PayoutRuleStatus::Cancelled => "CANCELLED",
        })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Due ACTIVE payout rules across every document (spec.md §4.7.9).
    pub async fn list_due_payout_rules(&self, now: DateTime<Utc>) -> Result<Vec<PayoutRule>, RepoError> {
        let rows: Vec<PayoutRuleRowTuple> = sqlx::query_as(&format!(
            "select {PAYOUT_RULE_COLUMNS} from payout_rules where status = 'ACTIVE' and next_run_at <= $1 order by next_run_at asc"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_payout_rule).collect())
    }

    pub async fn list_payout_rules(&self, doc_id: &str) -> Result<Vec<PayoutRule>, RepoError> {
        let rows: Vec<PayoutRuleRowTuple> = sqlx::query_as(&format!(
            "select {PAYOUT_RULE_COLUMNS} from payout_rules where doc_id = $1 order by rule_id"
        ))
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_payout_rule).collect())
    }

    /// Writes back `next_run_at`/`last_tx` after a payout attempt (spec.md
    /// §4.7.9). Called whether the attempt succeeded or failed; failure
    /// still advances `next_run_at` so a broken rule doesn't retry every
    /// tick forever — the audit/activity rows carry the failure detail.
    pub async fn advance_payout_rule(
        &self,
        rule_id: &str,
        next_run_at: DateTime<Utc>,
        last_tx: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "update payout_rules set next_run_at = $2, last_tx = coalesce($3, last_tx) where rule_id = $1",
        )
        .bind(rule_id)
        .bind(next_run_at)
        .bind(last_tx)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cancel_payout_rule(&self, rule_id: &str) -> Result<(), RepoError> {
        sqlx::query("update payout_rules set status = 'CANCELLED' where rule_id = $1")
            .bind(rule_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
