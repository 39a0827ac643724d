//! Integration port traits (spec.md §4.4). Each is a narrow capability
//! interface, grounded on `mqk-execution::order_router::BrokerAdapter`'s
//! "thin boundary, one trait per capability, adapter owns the wire format"
//! shape — made `async_trait` since every port call here is a suspension
//! point (spec.md §5), unlike the teacher's synchronous broker calls.
//!
//! Any port may be absent at runtime (spec.md §4.4); the dispatcher holds
//! `Option<Arc<dyn ...Port>>` per capability and raises
//! [`crate::PortError::Disabled`] when a command needs one that isn't wired.

use async_trait::async_trait;
use dw_schemas::{BalanceEntry, BridgeReceipt, ChannelStatus, ContractCallResult, PriceQuote, TxOutcome};
use serde_json::Value;

use crate::error::PortError;

/// A chain-native asset port: balance, native send, price, history, tx
/// status, and arbitrary contract calls/reads.
#[async_trait]
pub trait ChainPort: Send + Sync {
    async fn get_balance(&self, addr: &str) -> Result<BalanceEntry, PortError>;

    async fn send_native(
        &self,
        priv_key: &str,
        to: &str,
        amount: &str,
    ) -> Result<TxOutcome, PortError>;

    async fn get_price(&self) -> Result<PriceQuote, PortError>;

    async fn get_history(&self, addr: &str, limit: u32) -> Result<Vec<TxOutcome>, PortError>;

    async fn get_tx_status(&self, txid: &str) -> Result<TxOutcome, PortError>;

    async fn contract_call(
        &self,
        priv_key: &str,
        contract: &str,
        method: &str,
        args: &Value,
    ) -> Result<ContractCallResult, PortError>;

    async fn contract_read(
        &self,
        contract: &str,
        method: &str,
        args: &Value,
    ) -> Result<ContractCallResult, PortError>;
}

/// A stablecoin token port layered on top of a chain (spec.md §4.4
/// "Stablecoin-on-ChainA").
#[async_trait]
pub trait StablecoinPort: Send + Sync {
    async fn get_balance(&self, addr: &str) -> Result<BalanceEntry, PortError>;

    async fn transfer(&self, priv_key: &str, to: &str, amount: &str) -> Result<TxOutcome, PortError>;

    async fn approve(&self, priv_key: &str, spender: &str, amount: &str) -> Result<TxOutcome, PortError>;
}

/// Cross-chain bridging (spec.md §4.4).
#[async_trait]
pub trait BridgePort: Send + Sync {
    async fn bridge(
        &self,
        from_chain: &str,
        to_chain: &str,
        amount: &str,
        dest_addr: &str,
    ) -> Result<BridgeReceipt, PortError>;
}

/// A price source. The price tick (spec.md §4.7.7) binds two instances of
/// this same trait — "primary" and "secondary" — rather than using two
/// distinct traits, matching `MarketData`'s role as an optional secondary
/// source of the same shape as the chain's own price feed.
#[async_trait]
pub trait PricePort: Send + Sync {
    async fn get_price(&self, pair: &str) -> Result<PriceQuote, PortError>;
}

/// Off-chain payment channel lifecycle (spec.md §4.4).
#[async_trait]
pub trait StateChannelPort: Send + Sync {
    async fn create_session(&self, counterparty: &str) -> Result<ChannelStatus, PortError>;

    async fn submit_state(&self, channel_id: &str, amount: &str) -> Result<ChannelStatus, PortError>;

    async fn close_session(&self, channel_id: &str) -> Result<ChannelStatus, PortError>;

    async fn get_status(&self, channel_id: &str) -> Result<ChannelStatus, PortError>;
}

/// Demo-mode faucet funding (spec.md §4.4, gated by `DwConfig::faucet_auto_fund_allowed`).
#[async_trait]
pub trait FaucetPort: Send + Sync {
    async fn request(&self, addr: &str) -> Result<TxOutcome, PortError>;
}
