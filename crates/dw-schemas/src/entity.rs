//! Repository entities (spec.md §3), shared between `dw-repo` and every
//! crate that reads/writes them so there is exactly one definition of each
//! shape, mirroring `mqk-schemas`'s role as the single cross-crate wire type
//! module in the teacher workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::{CommandStatus, ParsedCommand};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub display_name: String,
    pub primary_address: Option<String>,
    pub secondary_address: Option<String>,
    pub last_user_hash: Option<Vec<u8>>,
    pub poll_failure_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub cmd_id: String,
    pub doc_id: String,
    pub raw_command: String,
    pub parsed_json: Option<serde_json::Value>,
    pub status: CommandStatus,
    pub tx_ref: Option<String>,
    pub result_text: Option<String>,
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Command {
    pub fn parsed(&self) -> Option<ParsedCommand> {
        self.parsed_json
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub doc_id: String,
    pub interval_hours: i32,
    pub inner_command_text: String,
    pub next_run_at: DateTime<Utc>,
    pub total_runs: i64,
    pub status: ScheduleStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionalOrderType {
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionalOrderStatus {
    Active,
    Triggered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalOrder {
    pub order_id: String,
    pub doc_id: String,
    pub order_type: ConditionalOrderType,
    pub base: String,
    pub quote: String,
    pub trigger_price: f64,
    pub qty: f64,
    pub status: ConditionalOrderStatus,
    pub triggered_cmd_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub pair: String,
    pub mid: f64,
    pub bid: f64,
    pub ask: f64,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutRuleStatus {
    Active,
    Cancelled,
}

/// A standing payout instruction (spec.md §4.7.9), distinct from a
/// [`Schedule`]: its inner action is a fixed transfer rather than an
/// arbitrary re-parsed command, and it executes directly through the
/// payment port rather than spawning a Command for the executor tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRule {
    pub rule_id: String,
    pub doc_id: String,
    pub recipient: String,
    pub asset: String,
    pub amount: String,
    pub interval_hours: i32,
    pub next_run_at: DateTime<Utc>,
    pub last_tx: Option<String>,
    pub status: PayoutRuleStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocConfigEntry {
    pub doc_id: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub doc_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentActivity {
    pub doc_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity_type: String,
    pub details: String,
    pub tx_ref: Option<String>,
}

/// Decrypted secret material for one document. Never derives `Debug` with
/// the real fields visible — see the hand-written impl below — so a stray
/// `{:?}` in a log line cannot leak a private key.
#[derive(Clone, Serialize, Deserialize)]
pub struct DocSecrets {
    pub chain_a: ChainKeypair,
    pub chain_b: Option<ChainKeypair>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChainKeypair {
    pub address: String,
    pub private_key: String,
}

impl std::fmt::Debug for DocSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocSecrets")
            .field("chain_a_address", &self.chain_a.address)
            .field("chain_a_private_key", &"<REDACTED>")
            .field("chain_b", &self.chain_b.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl std::fmt::Debug for ChainKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainKeypair")
            .field("address", &self.address)
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

/// Opaque identifier helper: every entity ID in this system is a plain
/// `String`; this newtype exists only for `Uuid`-backed generation call
/// sites so they read intentionally rather than sprinkling `Uuid::new_v4()`
/// ad hoc across tick implementations.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
