//! The approval HTTP surface (spec.md §6). `main.rs` wires a [`state::AppState`]
//! and hands it to [`routes::build_router`]; the nine-tick engine runs
//! alongside it in the same process via `dw-engine::TickScheduler`.

pub mod api_types;
pub mod routes;
pub mod state;

pub use state::AppState;
