use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("illegal state transition: {0}")]
    IllegalTransition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl From<RepoError> for dw_schemas::DwError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::IllegalTransition(m) => dw_schemas::DwError::IllegalStateTransition(m),
            RepoError::NotFound(m) => dw_schemas::DwError::Precondition(m),
            RepoError::Backend(e) => dw_schemas::DwError::TransientBackend(e.to_string()),
        }
    }
}
