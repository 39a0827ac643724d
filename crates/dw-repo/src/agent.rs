//! Support for the agent-decision tick's cooldown/dedup discipline (spec.md
//! §4.7.8): "per-proposal cooldowns and deduplication against recent
//! commands." Proposal identity is caller-defined (e.g. `"low_gas:CHAIN_A"`)
//! so the tick controls what counts as "the same proposal" without this
//! crate needing to know about alert kinds.

use chrono::{DateTime, Utc};

use crate::{Repo, RepoError};

impl Repo {
    /// Last time a given `(doc_id, proposal_key)` fired, if ever.
    pub async fn get_proposal_cooldown(
        &self,
        doc_id: &str,
        proposal_key: &str,
    ) -> Result<Option<DateTime<Utc>>, RepoError> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "select last_fired_at from agent_proposal_cooldowns where doc_id = $1 and proposal_key = $2",
        )
        .bind(doc_id)
        .bind(proposal_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(ts,)| ts))
    }

    /// Records that a proposal fired now, starting its cooldown window.
    pub async fn mark_proposal_fired(
        &self,
        doc_id: &str,
        proposal_key: &str,
        fired_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into agent_proposal_cooldowns (doc_id, proposal_key, last_fired_at)
            values ($1, $2, $3)
            on conflict (doc_id, proposal_key) do update set last_fired_at = excluded.last_fired_at
            "#,
        )
        .bind(doc_id)
        .bind(proposal_key)
        .bind(fired_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
