//! Shared Axum state (spec.md §9 "single context value"): the same
//! [`TickContext`] the engine's ticks run against, plus the [`TickStatusBoard`]
//! `GET /api/status` reads. Mirrors `mqk-daemon::state::AppState`'s role —
//! one cloneable handle, `Arc`-wrapped fields, no handler reaches the
//! repository/document backend any other way.

use std::sync::Arc;

use dw_engine::{TickContext, TickStatusBoard};

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<TickContext>,
    pub tick_status: Arc<TickStatusBoard>,
}

impl AppState {
    pub fn new(ctx: Arc<TickContext>, tick_status: Arc<TickStatusBoard>) -> Self {
        AppState { ctx, tick_status }
    }
}
