//! Row shapes for the human-facing document tables (spec.md §6). These are
//! the projection `dw-document` writes out and `dw-daemon` reads back for
//! the approval surface; they are deliberately flatter than the repository
//! entities in [`crate::entity`] since every field here must render as a
//! single cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mirrors the six-column Commands table of spec.md §6 exactly:
/// `ID, COMMAND, STATUS, APPROVAL_URL, RESULT, ERROR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRow {
    pub cmd_id: String,
    pub raw_command: String,
    pub status: String,
    pub approval_url: String,
    pub result: String,
    pub error: String,
}

/// Mirrors the two-column Chat table of spec.md §6: `USER, AGENT`. One row
/// per exchange; `agent` is empty until the chat tick (or a synchronous
/// auto-detect failure) fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRow {
    pub user: String,
    pub agent: String,
}

/// Mirrors the two-column Config table of spec.md §6: `KEY, VALUE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
}

/// Mirrors the RecentActivity table (spec.md §3, §4.2), written by the
/// executor tick on every EXECUTED command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivityRow {
    pub timestamp: DateTime<Utc>,
    pub activity_type: String,
    pub details: String,
    pub tx_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub asset: String,
    pub chain: String,
    pub amount: String,
    pub usd_value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrderRow {
    pub order_id: String,
    pub order_type: String,
    pub pair: String,
    pub trigger_price: String,
    pub qty: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRow {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Mirrors the optional PayoutRules table (spec.md §4.2, §4.7.9): one row
/// per standing payout, rewritten in place after each attempt with its
/// `next_run`, `last_tx`, and `status` cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRuleRow {
    pub rule_id: String,
    pub recipient: String,
    pub asset: String,
    pub amount: String,
    pub interval_hours: String,
    pub next_run_at: DateTime<Utc>,
    pub last_tx: String,
    pub status: String,
}

/// The full set of tables written on a document snapshot, one field per
/// sheet/section named in spec.md §6. `dw-document` backends render this;
/// `dw-engine` ticks populate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTables {
    pub config: Vec<ConfigRow>,
    pub commands: Vec<CommandRow>,
    pub chat: Vec<ChatRow>,
    pub balances: Vec<BalanceRow>,
    pub open_orders: Vec<OpenOrderRow>,
    pub audit: Vec<AuditRow>,
    pub recent_activity: Vec<RecentActivityRow>,
    pub payout_rules: Vec<PayoutRuleRow>,
}
