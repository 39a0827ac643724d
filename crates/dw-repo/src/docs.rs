use dw_schemas::Document;

use crate::{Repo, RepoError};

impl Repo {
    pub async fn upsert_doc(&self, doc: &Document) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into documents (doc_id, display_name, primary_address, secondary_address, last_user_hash, poll_failure_count)
            values ($1, $2, $3, $4, $5, $6)
            on conflict (doc_id) do update set
              display_name = excluded.display_name
            "#,
        )
        .bind(&doc.doc_id)
        .bind(&doc.display_name)
        .bind(&doc.primary_address)
        .bind(&doc.secondary_address)
        .bind(&doc.last_user_hash)
        .bind(doc.poll_failure_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_docs(&self) -> Result<Vec<Document>, RepoError> {
        let rows: Vec<(String, String, Option<String>, Option<String>, Option<Vec<u8>>, i32)> =
            sqlx::query_as(
                "select doc_id, display_name, primary_address, secondary_address, last_user_hash, poll_failure_count from documents order by doc_id",
            )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(doc_id, display_name, primary_address, secondary_address, last_user_hash, poll_failure_count)| {
                    Document {
                        doc_id,
                        display_name,
                        primary_address,
                        secondary_address,
                        last_user_hash,
                        poll_failure_count,
                    }
                },
            )
            .collect())
    }

    pub async fn remove_doc(&self, doc_id: &str) -> Result<(), RepoError> {
        sqlx::query("delete from documents where doc_id = $1")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_doc_addresses(
        &self,
        doc_id: &str,
        primary_address: Option<&str>,
        secondary_address: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "update documents set primary_address = $2, secondary_address = $3 where doc_id = $1",
        )
        .bind(doc_id)
        .bind(primary_address)
        .bind(secondary_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_doc_last_user_hash(&self, doc_id: &str, hash: &[u8]) -> Result<(), RepoError> {
        sqlx::query("update documents set last_user_hash = $2 where doc_id = $1")
            .bind(doc_id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Increments the per-doc poll failure counter; returns the new count.
    /// The poll tick compares this against [`dw_config::DEFAULT_POLL_FAILURE_LIMIT`]
    /// (or its configured override) to decide whether to drop the document.
    pub async fn increment_poll_failure(&self, doc_id: &str) -> Result<i32, RepoError> {
        let (count,): (i32,) = sqlx::query_as(
            "update documents set poll_failure_count = poll_failure_count + 1 where doc_id = $1 returning poll_failure_count",
        )
        .bind(doc_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn reset_poll_failure(&self, doc_id: &str) -> Result<(), RepoError> {
        sqlx::query("update documents set poll_failure_count = 0 where doc_id = $1")
            .bind(doc_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
