use crate::{Repo, RepoError};

impl Repo {
    /// Stores the ciphertext blob produced by `dw_vault::MasterKey::encrypt`.
    /// The repository never sees plaintext (spec.md §5, I6).
    pub async fn put_doc_secrets_blob(&self, doc_id: &str, ciphertext: &[u8]) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into doc_secrets (doc_id, ciphertext) values ($1, $2)
            on conflict (doc_id) do update set ciphertext = excluded.ciphertext
            "#,
        )
        .bind(doc_id)
        .bind(ciphertext)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_doc_secrets_blob(&self, doc_id: &str) -> Result<Option<Vec<u8>>, RepoError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("select ciphertext from doc_secrets where doc_id = $1")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(blob,)| blob))
    }

    pub async fn has_doc_secrets(&self, doc_id: &str) -> Result<bool, RepoError> {
        let row: Option<(i32,)> =
            sqlx::query_as("select 1 from doc_secrets where doc_id = $1")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}
