//! Live HTTP chain adapter. Grounded on `mqk-broker-alpaca`'s shape (a
//! `reqwest`-backed crate that is, deliberately, a thin wire translator and
//! nothing else) — but fully async, since every port call in this workspace
//! is an async suspension point (spec.md §5), unlike the teacher's
//! `reqwest::blocking` + `block_in_place` adapter.

use std::time::Duration;

use async_trait::async_trait;
use dw_schemas::{BalanceEntry, ContractCallResult, PriceQuote, TxOutcome};
use serde_json::{Value, json};

use crate::error::PortError;
use crate::traits::ChainPort;

/// Request timeout for every call through this adapter (spec.md §5: "every
/// external call has a bounded timeout, typically 8-30s").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A JSON-RPC style live chain adapter. Each method POSTs a small envelope
/// to `endpoint` and maps the JSON response into the shared port result
/// types; it holds no chain-specific logic beyond that translation.
pub struct HttpChainPort {
    chain_name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpChainPort {
    pub fn new(chain_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            chain_name: chain_name.into(),
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client with static TLS config always builds"),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let body = json!({ "method": method, "params": params });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Transient(format!("{} rpc call failed: {e}", self.chain_name)))?;

        if !response.status().is_success() {
            return Err(PortError::Execution(format!(
                "{} rpc call returned status {}",
                self.chain_name,
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| PortError::Transient(format!("{} rpc response decode failed: {e}", self.chain_name)))
    }
}

#[async_trait]
impl ChainPort for HttpChainPort {
    async fn get_balance(&self, addr: &str) -> Result<BalanceEntry, PortError> {
        let reply = self.call("get_balance", json!({ "address": addr })).await?;
        let amount = reply
            .get("balance")
            .and_then(Value::as_str)
            .ok_or_else(|| PortError::Execution(format!("{} get_balance: missing balance field", self.chain_name)))?
            .to_string();
        Ok(BalanceEntry {
            asset: self.chain_name.clone(),
            amount,
            usd_value: reply.get("usd_value").and_then(Value::as_f64),
        })
    }

    async fn send_native(&self, priv_key: &str, to: &str, amount: &str) -> Result<TxOutcome, PortError> {
        let reply = self
            .call(
                "send_native",
                json!({ "private_key": priv_key, "to": to, "amount": amount }),
            )
            .await?;
        extract_tx_outcome(&reply, &self.chain_name)
    }

    async fn get_price(&self) -> Result<PriceQuote, PortError> {
        let reply = self.call("get_price", json!({})).await?;
        let mid = reply
            .get("mid")
            .and_then(Value::as_f64)
            .ok_or_else(|| PortError::Execution(format!("{} get_price: missing mid field", self.chain_name)))?;
        Ok(PriceQuote {
            pair: format!("{}/USD", self.chain_name),
            mid,
            bid: reply.get("bid").and_then(Value::as_f64).unwrap_or(mid),
            ask: reply.get("ask").and_then(Value::as_f64).unwrap_or(mid),
            source: self.chain_name.clone(),
            as_of: chrono::Utc::now(),
        })
    }

    async fn get_history(&self, addr: &str, limit: u32) -> Result<Vec<TxOutcome>, PortError> {
        let reply = self
            .call("get_history", json!({ "address": addr, "limit": limit }))
            .await?;
        let entries = reply
            .get("history")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        entries
            .iter()
            .map(|entry| extract_tx_outcome(entry, &self.chain_name))
            .collect()
    }

    async fn get_tx_status(&self, txid: &str) -> Result<TxOutcome, PortError> {
        let reply = self.call("get_tx_status", json!({ "txid": txid })).await?;
        extract_tx_outcome(&reply, &self.chain_name)
    }

    async fn contract_call(
        &self,
        priv_key: &str,
        contract: &str,
        method: &str,
        args: &Value,
    ) -> Result<ContractCallResult, PortError> {
        let reply = self
            .call(
                "contract_call",
                json!({ "private_key": priv_key, "contract": contract, "method": method, "args": args }),
            )
            .await?;
        Ok(ContractCallResult {
            tx_ref: reply.get("tx_ref").and_then(Value::as_str).map(str::to_string),
            return_value: reply.get("return_value").cloned(),
        })
    }

    async fn contract_read(
        &self,
        contract: &str,
        method: &str,
        args: &Value,
    ) -> Result<ContractCallResult, PortError> {
        let reply = self
            .call("contract_read", json!({ "contract": contract, "method": method, "args": args }))
            .await?;
        Ok(ContractCallResult {
            tx_ref: None,
            return_value: reply.get("return_value").cloned(),
        })
    }
}

fn extract_tx_outcome(value: &Value, chain_name: &str) -> Result<TxOutcome, PortError> {
    let tx_ref = value
        .get("tx_ref")
        .and_then(Value::as_str)
        .ok_or_else(|| PortError::Execution(format!("{chain_name}: missing tx_ref field")))?
        .to_string();
    let confirmed = value.get("confirmed").and_then(Value::as_bool).unwrap_or(false);
    Ok(TxOutcome { tx_ref, confirmed })
}
