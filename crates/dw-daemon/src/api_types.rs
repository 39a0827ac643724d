//! Request and response types for the approval HTTP surface (spec.md §6).
//! `Serialize + Deserialize` so Axum can (de)code them directly; no business
//! logic lives here, mirroring `mqk-daemon::api_types`.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/command-decision`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandDecisionRequest {
    pub doc_id: String,
    pub cmd_id: String,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandDecisionResponse {
    pub cmd_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One tick's last-fire bookkeeping, as surfaced by `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct TickStatusEntry {
    pub running: bool,
    pub last_finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
}

/// `GET /api/status` (spec.md §6: "returns counters").
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub tracked_docs: usize,
    pub pending_approval_commands: i64,
    pub approved_commands: i64,
    pub active_conditional_orders: i64,
    pub ticks: std::collections::BTreeMap<String, TickStatusEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocSummary {
    pub doc_id: String,
    pub display_name: String,
    pub primary_address: Option<String>,
    pub secondary_address: Option<String>,
    pub poll_failure_count: i32,
}

/// `GET /api/docs` (spec.md §6: "lists tracked docs").
#[derive(Debug, Clone, Serialize)]
pub struct DocsResponse {
    pub docs: Vec<DocSummary>,
}
