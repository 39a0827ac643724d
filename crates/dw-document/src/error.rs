use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document backend I/O failure; retried at the next poll tick.
    #[error("document backend transient failure: {0}")]
    Transient(String),

    /// The document itself is gone (deleted, unshared) — not retried; the
    /// caller removes it from tracking.
    #[error("document not found: {0}")]
    NotFound(String),
}

impl From<DocumentError> for dw_schemas::DwError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::Transient(m) => dw_schemas::DwError::TransientBackend(m),
            DocumentError::NotFound(m) => dw_schemas::DwError::Precondition(m),
        }
    }
}
