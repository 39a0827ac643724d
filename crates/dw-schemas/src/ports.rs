//! Result types shared by every integration port in `dw-ports` and the
//! dispatcher/engine crates that consume them, kept here so `dw-ports` and
//! `dw-dispatcher` depend on one shape instead of duplicating structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub asset: String,
    pub amount: String,
    pub usd_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub pair: String,
    pub mid: f64,
    pub bid: f64,
    pub ask: f64,
    pub source: String,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub tx_ref: String,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReceipt {
    pub source_tx_ref: String,
    pub dest_tx_ref: Option<String>,
    pub status: BridgeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStatus {
    Pending,
    Settled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub local_balance: String,
    pub remote_balance: String,
    pub is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCallResult {
    pub tx_ref: Option<String>,
    pub return_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortKind {
    ChainA,
    ChainB,
    Stablecoin,
    Bridge,
    MarketData,
    StateChannel,
    Faucet,
}
