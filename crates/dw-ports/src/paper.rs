//! Deterministic in-memory "paper" port implementations, used for demo mode
//! and tests. Grounded on `mqk-broker-paper::PaperBroker`: no randomness, no
//! wall-clock reads; identifiers are derived from stable inputs plus a
//! monotonically increasing in-process sequence number, exactly like the
//! teacher's `paper:msg:submit:{client_order_id}` scheme.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dw_schemas::{
    BalanceEntry, BridgeReceipt, BridgeStatus, ChannelStatus, ContractCallResult, PriceQuote,
    TxOutcome,
};
use serde_json::Value;

use crate::error::PortError;
use crate::traits::{BridgePort, ChainPort, FaucetPort, PricePort, StablecoinPort, StateChannelPort};

fn next_seq(counter: &Mutex<u64>) -> u64 {
    let mut guard = counter.lock().expect("paper port counter poisoned");
    *guard += 1;
    *guard
}

/// Deterministic chain-native asset port. Balances and history are seeded
/// explicitly via [`Self::credit`]/constructors; nothing is invented.
#[derive(Default)]
pub struct PaperChainPort {
    chain_name: String,
    balances: Mutex<BTreeMap<String, String>>,
    seq: Mutex<u64>,
}

impl PaperChainPort {
    pub fn new(chain_name: impl Into<String>) -> Self {
        Self {
            chain_name: chain_name.into(),
            balances: Mutex::new(BTreeMap::new()),
            seq: Mutex::new(0),
        }
    }

    /// Test/demo-mode hook: set an address's balance directly (e.g. after a
    /// faucet request).
    pub fn credit(&self, addr: &str, amount: &str) {
        self.balances
            .lock()
            .expect("paper chain port balances poisoned")
            .insert(addr.to_string(), amount.to_string());
    }
}

#[async_trait]
impl ChainPort for PaperChainPort {
    async fn get_balance(&self, addr: &str) -> Result<BalanceEntry, PortError> {
        let amount = self
            .balances
            .lock()
            .expect("paper chain port balances poisoned")
            .get(addr)
            .cloned()
            .unwrap_or_else(|| "0".to_string());
        Ok(BalanceEntry {
            asset: self.chain_name.clone(),
            amount,
            usd_value: None,
        })
    }

    async fn send_native(&self, _priv_key: &str, to: &str, amount: &str) -> Result<TxOutcome, PortError> {
        let seq = next_seq(&self.seq);
        self.credit(to, amount);
        Ok(TxOutcome {
            tx_ref: format!("paper:{}:send:{}", self.chain_name, seq),
            confirmed: true,
        })
    }

    async fn get_price(&self) -> Result<PriceQuote, PortError> {
        Ok(PriceQuote {
            pair: format!("{}/USD", self.chain_name),
            mid: 1.0,
            bid: 1.0,
            ask: 1.0,
            source: format!("paper:{}", self.chain_name),
            as_of: Utc::now(),
        })
    }

    async fn get_history(&self, _addr: &str, _limit: u32) -> Result<Vec<TxOutcome>, PortError> {
        Ok(Vec::new())
    }

    async fn get_tx_status(&self, txid: &str) -> Result<TxOutcome, PortError> {
        Ok(TxOutcome {
            tx_ref: txid.to_string(),
            confirmed: true,
        })
    }

    async fn contract_call(
        &self,
        _priv_key: &str,
        _contract: &str,
        _method: &str,
        _args: &Value,
    ) -> Result<ContractCallResult, PortError> {
        let seq = next_seq(&self.seq);
        Ok(ContractCallResult {
            tx_ref: Some(format!("paper:{}:call:{}", self.chain_name, seq)),
            return_value: None,
        })
    }

    async fn contract_read(
        &self,
        _contract: &str,
        _method: &str,
        _args: &Value,
    ) -> Result<ContractCallResult, PortError> {
        Ok(ContractCallResult {
            tx_ref: None,
            return_value: Some(Value::Null),
        })
    }
}

/// Deterministic stablecoin-on-chain port, identical ledger style to
/// [`PaperChainPort`] but kept as a distinct type since the two traits are
/// separate capabilities (spec.md §4.4).
#[derive(Default)]
pub struct PaperStablecoinPort {
    symbol: String,
    balances: Mutex<BTreeMap<String, String>>,
    seq: Mutex<u64>,
}

impl PaperStablecoinPort {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: Mutex::new(BTreeMap::new()),
            seq: Mutex::new(0),
        }
    }

    pub fn credit(&self, addr: &str, amount: &str) {
        self.balances
            .lock()
            .expect("paper stablecoin port balances poisoned")
            .insert(addr.to_string(), amount.to_string());
    }
}

#[async_trait]
impl StablecoinPort for PaperStablecoinPort {
    async fn get_balance(&self, addr: &str) -> Result<BalanceEntry, PortError> {
        let amount = self
            .balances
            .lock()
            .expect("paper stablecoin port balances poisoned")
            .get(addr)
            .cloned()
            .unwrap_or_else(|| "0".to_string());
        Ok(BalanceEntry {
            asset: self.symbol.clone(),
            amount,
            usd_value: None,
        })
    }

    async fn transfer(&self, _priv_key: &str, to: &str, amount: &str) -> Result<TxOutcome, PortError> {
        let seq = next_seq(&self.seq);
        self.credit(to, amount);
        Ok(TxOutcome {
            tx_ref: format!("paper:{}:transfer:{}", self.symbol, seq),
            confirmed: true,
        })
    }

    async fn approve(&self, _priv_key: &str, _spender: &str, _amount: &str) -> Result<TxOutcome, PortError> {
        let seq = next_seq(&self.seq);
        Ok(TxOutcome {
            tx_ref: format!("paper:{}:approve:{}", self.symbol, seq),
            confirmed: true,
        })
    }
}

/// Deterministic bridge port: always settles immediately.
#[derive(Default)]
pub struct PaperBridgePort {
    seq: Mutex<u64>,
}

impl PaperBridgePort {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BridgePort for PaperBridgePort {
    async fn bridge(
        &self,
        from_chain: &str,
        to_chain: &str,
        _amount: &str,
        _dest_addr: &str,
    ) -> Result<BridgeReceipt, PortError> {
        let seq = next_seq(&self.seq);
        Ok(BridgeReceipt {
            source_tx_ref: format!("paper:bridge:{from_chain}:{seq}"),
            dest_tx_ref: Some(format!("paper:bridge:{to_chain}:{seq}")),
            status: BridgeStatus::Settled,
        })
    }
}

/// Deterministic price port. Holds one fixed quote per pair, set via
/// [`Self::set_price`]; never invents a price.
#[derive(Default)]
pub struct PaperPricePort {
    prices: Mutex<BTreeMap<String, f64>>,
    source_name: String,
}

impl PaperPricePort {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            prices: Mutex::new(BTreeMap::new()),
            source_name: source_name.into(),
        }
    }

    pub fn set_price(&self, pair: &str, mid: f64) {
        self.prices
            .lock()
            .expect("paper price port prices poisoned")
            .insert(pair.to_string(), mid);
    }
}

#[async_trait]
impl PricePort for PaperPricePort {
    async fn get_price(&self, pair: &str) -> Result<PriceQuote, PortError> {
        let mid = self
            .prices
            .lock()
            .expect("paper price port prices poisoned")
            .get(pair)
            .copied()
            .ok_or_else(|| PortError::Transient(format!("no paper price set for {pair}")))?;
        Ok(PriceQuote {
            pair: pair.to_string(),
            mid,
            bid: mid,
            ask: mid,
            source: self.source_name.clone(),
            as_of: Utc::now(),
        })
    }
}

/// Deterministic off-chain payment channel port.
#[derive(Default)]
pub struct PaperStateChannelPort {
    channels: Mutex<BTreeMap<String, ChannelStatus>>,
    seq: Mutex<u64>,
}

impl PaperStateChannelPort {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateChannelPort for PaperStateChannelPort {
    async fn create_session(&self, counterparty: &str) -> Result<ChannelStatus, PortError> {
        let seq = next_seq(&self.seq);
        let channel_id = format!("paper:channel:{counterparty}:{seq}");
        let status = ChannelStatus {
            channel_id: channel_id.clone(),
            local_balance: "0".to_string(),
            remote_balance: "0".to_string(),
            is_open: true,
        };
        self.channels
            .lock()
            .expect("paper state channel port poisoned")
            .insert(channel_id, status.clone());
        Ok(status)
    }

    async fn submit_state(&self, channel_id: &str, amount: &str) -> Result<ChannelStatus, PortError> {
        let mut channels = self.channels.lock().expect("paper state channel port poisoned");
        let status = channels
            .get_mut(channel_id)
            .ok_or_else(|| PortError::Precondition(format!("channel {channel_id} not open")))?;
        status.local_balance = amount.to_string();
        Ok(status.clone())
    }

    async fn close_session(&self, channel_id: &str) -> Result<ChannelStatus, PortError> {
        let mut channels = self.channels.lock().expect("paper state channel port poisoned");
        let status = channels
            .get_mut(channel_id)
            .ok_or_else(|| PortError::Precondition(format!("channel {channel_id} not open")))?;
        status.is_open = false;
        Ok(status.clone())
    }

    async fn get_status(&self, channel_id: &str) -> Result<ChannelStatus, PortError> {
        self.channels
            .lock()
            .expect("paper state channel port poisoned")
            .get(channel_id)
            .cloned()
            .ok_or_else(|| PortError::Precondition(format!("channel {channel_id} not found")))
    }
}

/// Deterministic demo-mode faucet. Always grants a fixed amount.
pub struct PaperFaucetPort {
    grant_amount: String,
    seq: Mutex<u64>,
}

impl PaperFaucetPort {
    pub fn new(grant_amount: impl Into<String>) -> Self {
        Self {
            grant_amount: grant_amount.into(),
            seq: Mutex::new(0),
        }
    }
}

#[async_trait]
impl FaucetPort for PaperFaucetPort {
    async fn request(&self, addr: &str) -> Result<TxOutcome, PortError> {
        let seq = next_seq(&self.seq);
        let _ = (addr, &self.grant_amount);
        Ok(TxOutcome {
            tx_ref: format!("paper:faucet:{seq}"),
            confirmed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chain_port_send_credits_recipient_and_is_confirmed() {
        let port = PaperChainPort::new("CHAINA");
        let outcome = port.send_native("priv", "addr-1", "10").await.unwrap();
        assert!(outcome.confirmed);
        let balance = port.get_balance("addr-1").await.unwrap();
        assert_eq!(balance.amount, "10");
    }

    #[tokio::test]
    async fn unset_balance_defaults_to_zero() {
        let port = PaperChainPort::new("CHAINA");
        let balance = port.get_balance("unknown").await.unwrap();
        assert_eq!(balance.amount, "0");
    }

    #[tokio::test]
    async fn bridge_always_settles() {
        let port = PaperBridgePort::new();
        let receipt = port.bridge("CHAINA", "CHAINB", "5", "dest").await.unwrap();
        assert_eq!(receipt.status, BridgeStatus::Settled);
        assert!(receipt.dest_tx_ref.is_some());
    }

    #[tokio::test]
    async fn price_port_errors_when_no_price_is_seeded() {
        let port = PaperPricePort::new("paper");
        assert!(port.get_price("CHAINA/USD").await.is_err());
    }

    #[tokio::test]
    async fn price_port_returns_seeded_price() {
        let port = PaperPricePort::new("paper");
        port.set_price("CHAINA/USD", 2.5);
        let quote = port.get_price("CHAINA/USD").await.unwrap();
        assert_eq!(quote.mid, 2.5);
    }

    #[tokio::test]
    async fn state_channel_lifecycle() {
        let port = PaperStateChannelPort::new();
        let status = port.create_session("counterparty").await.unwrap();
        assert!(status.is_open);
        let updated = port.submit_state(&status.channel_id, "42").await.unwrap();
        assert_eq!(updated.local_balance, "42");
        let closed = port.close_session(&status.channel_id).await.unwrap();
        assert!(!closed.is_open);
    }

    #[tokio::test]
    async fn submit_state_on_unknown_channel_is_a_precondition_error() {
        let port = PaperStateChannelPort::new();
        assert!(port.submit_state("missing", "1").await.is_err());
    }

    #[tokio::test]
    async fn faucet_request_is_always_confirmed() {
        let port = PaperFaucetPort::new("10");
        let outcome = port.request("addr-1").await.unwrap();
        assert!(outcome.confirmed);
    }
}
