use thiserror::Error;

/// Error taxonomy for integration ports, aligned to spec.md §7's
/// `TransientBackendError` / `PreconditionError` / `ExecutionError` split,
/// plus the port-specific `Disabled` case from spec.md §4.4 ("the dispatcher
/// raises `<port> disabled` when a command requires an absent port").
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{0} disabled")]
    Disabled(String),

    #[error("integration port transient failure: {0}")]
    Transient(String),

    #[error("integration port precondition failed: {0}")]
    Precondition(String),

    #[error("integration port execution failure: {0}")]
    Execution(String),
}

impl From<PortError> for dw_schemas::DwError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Disabled(m) => dw_schemas::DwError::Precondition(format!("{m} disabled")),
            PortError::Transient(m) => dw_schemas::DwError::TransientBackend(m),
            PortError::Precondition(m) => dw_schemas::DwError::Precondition(m),
            PortError::Execution(m) => dw_schemas::DwError::Execution(m),
        }
    }
}
