pub mod auto_detect;
pub mod error;
pub mod grammar;

pub use auto_detect::try_auto_detect;
pub use error::ParseError;
pub use grammar::{format, parse};

/// `true` when `raw` already begins with the canonical verb prefix, the
/// check poll uses before falling back to [`try_auto_detect`] (spec.md
/// §4.7.2 step 3).
pub fn has_canonical_prefix(raw: &str) -> bool {
    raw.trim_start().to_ascii_uppercase().starts_with("DW ")
}
