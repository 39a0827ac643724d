/// Dispatch failure taxonomy (SPEC_FULL.md §4.5), aligned one-to-one with
/// spec.md §7's error kinds. The executor tick (`dw-engine`) maps every
/// variant straight to `FAILED` + `errorText`; the dispatcher itself never
/// mutates repository state and never panics on a port failure.
#[derive(Debug, Clone)]
pub enum DispatchError {
    /// A precondition resource was missing and could not be satisfied:
    /// wallet not set up, insufficient gas, channel closed.
    Precondition(String),
    /// The integration port reported a business failure (insufficient
    /// funds, invalid recipient, rejected contract call).
    Execution(String),
    /// The command requires a port that isn't wired for this process
    /// (spec.md §4.4: "the dispatcher raises `<port> disabled`").
    PortDisabled(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Precondition(m) => write!(f, "{m}"),
            DispatchError::Execution(m) => write!(f, "{m}"),
            DispatchError::PortDisabled(port) => write!(f, "{port} disabled"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<dw_ports::PortError> for DispatchError {
    fn from(e: dw_ports::PortError) -> Self {
        match e {
            dw_ports::PortError::Disabled(port) => DispatchError::PortDisabled(port),
            dw_ports::PortError::Transient(m) => DispatchError::Execution(m),
            dw_ports::PortError::Precondition(m) => DispatchError::Precondition(m),
            dw_ports::PortError::Execution(m) => DispatchError::Execution(m),
        }
    }
}

impl From<DispatchError> for dw_schemas::DwError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Precondition(m) => dw_schemas::DwError::Precondition(m),
            DispatchError::Execution(m) => dw_schemas::DwError::Execution(m),
            DispatchError::PortDisabled(port) => {
                dw_schemas::DwError::Precondition(format!("{port} disabled"))
            }
        }
    }
}
