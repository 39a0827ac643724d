//! The nine-tick orchestration engine (spec.md §4.6–§4.7). `dw-daemon` is
//! the only caller: it builds a [`context::TickContext`], wraps it in a
//! [`runtime::TickScheduler`], and runs it alongside the HTTP approval
//! surface.

pub mod agent_decision;
pub mod balances;
pub mod chat;
pub mod context;
pub mod discovery;
pub mod executor;
pub mod mirror;
pub mod payout_rules;
pub mod poll;
pub mod price;
pub mod runtime;
pub mod scheduler;
pub mod status;

pub use context::TickContext;
pub use runtime::TickScheduler;
pub use status::{TickStatus, TickStatusBoard};
