use dw_schemas::DocConfigEntry;

use crate::{Repo, RepoError};

impl Repo {
    pub async fn get_doc_config(&self, doc_id: &str, key: &str) -> Result<Option<String>, RepoError> {
        let row: Option<(String,)> =
            sqlx::query_as("select value from doc_config where doc_id = $1 and key = $2")
                .bind(doc_id)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set_doc_config(&self, doc_id: &str, key: &str, value: &str) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into doc_config (doc_id, key, value) values ($1, $2, $3)
            on conflict (doc_id, key) do update set value = excluded.value
            "#,
        )
        .bind(doc_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_doc_config(&self, doc_id: &str) -> Result<Vec<DocConfigEntry>, RepoError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("select key, value from doc_config where doc_id = $1 order by key")
                .bind(doc_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(key, value)| DocConfigEntry {
                doc_id: doc_id.to_string(),
                key,
                value,
            })
            .collect())
    }
}
