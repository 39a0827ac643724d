use std::fmt;

/// Local parse failure, carrying the offending token for the caller to
/// surface verbatim (spec.md §6: "parse errors include the offending
/// token"). Converted to [`dw_schemas::DwError::Parse`] at the crate
/// boundary rather than reused directly, the way `mqk-execution`'s
/// internal errors convert into the daemon's response types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offending_token: String,
    pub message: String,
}

impl ParseError {
    pub fn new(offending_token: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError {
            offending_token: offending_token.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {:?}: {}", self.offending_token, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for dw_schemas::DwError {
    fn from(e: ParseError) -> Self {
        dw_schemas::DwError::Parse {
            offending_token: e.offending_token,
            message: e.message,
        }
    }
}
