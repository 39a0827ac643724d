use chrono::{DateTime, Utc};
use dw_schemas::{AuditEvent, RecentActivity};

use crate::{Repo, RepoError};

impl Repo {
    /// Append-only audit line (spec.md §7 "a line in the Audit table").
    pub async fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), RepoError> {
        sqlx::query("insert into audit_events (doc_id, timestamp, message) values ($1, $2, $3)")
            .bind(&event.doc_id)
            .bind(event.timestamp)
            .bind(&event.message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_audit_events(&self, doc_id: &str, n: i64) -> Result<Vec<AuditEvent>, RepoError> {
        let rows: Vec<(DateTime<Utc>, String)> = sqlx::query_as(
            "select timestamp, message from audit_events where doc_id = $1 order by timestamp desc limit $2",
        )
        .bind(doc_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(timestamp, message)| AuditEvent {
                doc_id: doc_id.to_string(),
                timestamp,
                message,
            })
            .collect())
    }

    /// Append-only, capped-size activity feed (spec.md §3). Capping happens
    /// on read (`list_recent_activity`'s `n`); rows are never deleted here
    /// so the audit trail in the database stays complete.
    pub async fn insert_recent_activity(&self, activity: &RecentActivity) -> Result<(), RepoError> {
        sqlx::query(
            "insert into recent_activity (doc_id, timestamp, type, details, tx_ref) values ($1, $2, $3, $4, $5)",
        )
        .bind(&activity.doc_id)
        .bind(activity.timestamp)
        .bind(&activity.activity_type)
        .bind(&activity.details)
        .bind(&activity.tx_ref)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_recent_activity(&self, doc_id: &str, n: i64) -> Result<Vec<RecentActivity>, RepoError> {
        let rows: Vec<(DateTime<Utc>, String, String, Option<String>)> = sqlx::query_as(
            "select timestamp, type, details, tx_ref from recent_activity where doc_id = $1 order by timestamp desc limit $2",
        )
        .bind(doc_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(timestamp, activity_type, details, tx_ref)| RecentActivity {
                doc_id: doc_id.to_string(),
                timestamp,
                activity_type,
                details,
                tx_ref,
            })
            .collect())
    }
}
