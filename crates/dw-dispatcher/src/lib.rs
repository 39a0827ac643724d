//! Execution dispatcher (spec.md §4.5): given a parsed command and a
//! document's decrypted secret bundle, invokes the right integration
//! port(s) and returns `{resultText, txRef?}` or a typed failure.
//!
//! Grounded on `mqk-execution::gateway::BrokerGateway`: a single public
//! entry point (`Dispatcher::dispatch`) that is the sole way to reach a
//! port, with every arm independent and none of them touching repository
//! state — the teacher's gateway enforces gate verdicts before delegating
//! to its private `OrderRouter`; this dispatcher enforces "is the right
//! port wired" before delegating to it. The executor tick (`dw-engine`)
//! is the only caller and the only place repository state changes.

pub mod error;
pub mod registry;

pub use error::DispatchError;
pub use registry::PortRegistry;

use dw_schemas::{ChainKeypair, DocSecrets, ParsedCommand};
use serde_json::json;

/// A conditional order the dispatcher parsed out of a STOP_LOSS/TAKE_PROFIT
/// command but did not persist — only the executor tick writes repository
/// state (spec.md §4.5). Mirrors [`dw_schemas::ConditionalOrder`] minus the
/// fields the repository assigns itself (`status`, `triggered_cmd_id`).
#[derive(Debug, Clone)]
pub struct ConditionalOrderDraft {
    pub order_type: dw_schemas::ConditionalOrderType,
    pub base: String,
    pub quote: String,
    pub trigger_price: f64,
    pub qty: f64,
}

/// A Schedule the dispatcher parsed out of a `DW SCHEDULE` command but did
/// not persist — only the executor tick writes repository state (spec.md
/// §4.5), the same way `ConditionalOrderDraft` works for STOP_LOSS/
/// TAKE_PROFIT. The executor assigns `schedule_id`, `next_run_at`, and
/// `total_runs = 0`.
#[derive(Debug, Clone)]
pub struct ScheduleDraft {
    pub interval_hours: u32,
    pub inner_command_text: String,
}

/// Everything the dispatcher produced for one dispatch call. The executor
/// tick persists `provisioned_secrets`, `conditional_order`, and `schedule`
/// (if present) back through the vault/repository, applies `cancel_order_id`/
/// `cancel_schedule_id`, and appends `audit_lines` to the document's Audit
/// table — the dispatcher itself never writes to any of them (spec.md §4.5:
/// "the dispatcher never mutates repo state itself; the executor tick
/// does").
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result_text: String,
    pub tx_ref: Option<String>,
    pub provisioned_secrets: Option<DocSecrets>,
    pub conditional_order: Option<ConditionalOrderDraft>,
    pub schedule: Option<ScheduleDraft>,
    /// An ACTIVE ConditionalOrder the executor should cancel (`DW
    /// CANCEL_ORDER`).
    pub cancel_order_id: Option<String>,
    /// An ACTIVE Schedule the executor should cancel (`DW
    /// CANCEL_SCHEDULE`).
    pub cancel_schedule_id: Option<String>,
    /// `doc_config` key/values the executor should persist (spec.md §4.4:
    /// AUTO_REBALANCE, ALERT_THRESHOLD, and SETUP's `EVM_ADDRESS`/`STATUS`
    /// settings outlive the command that set them). The dispatcher never
    /// writes the repository directly.
    pub doc_config_writes: Vec<(String, String)>,
    pub audit_lines: Vec<String>,
}

impl DispatchOutcome {
    fn simple(result_text: impl Into<String>) -> Self {
        Self {
            result_text: result_text.into(),
            tx_ref: None,
            provisioned_secrets: None,
            conditional_order: None,
            schedule: None,
            cancel_order_id: None,
            cancel_schedule_id: None,
            doc_config_writes: Vec::new(),
            audit_lines: Vec::new(),
        }
    }

    fn with_tx(result_text: impl Into<String>, tx_ref: impl Into<String>) -> Self {
        Self {
            result_text: result_text.into(),
            tx_ref: Some(tx_ref.into()),
            provisioned_secrets: None,
            conditional_order: None,
            schedule: None,
            cancel_order_id: None,
            cancel_schedule_id: None,
            doc_config_writes: Vec::new(),
            audit_lines: Vec::new(),
        }
    }
}

/// The single entry point through which every dispatch flows. Owns the
/// process's [`PortRegistry`]; every other crate reaches a port only
/// through this type.
pub struct Dispatcher {
    ports: PortRegistry,
}

impl Dispatcher {
    pub fn new(ports: PortRegistry) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    /// Dispatches one parsed command. `demo_mode` gates faucet auto-funding
    /// on SETUP (spec.md §9, resolved conservatively in `DESIGN.md`).
    pub async fn dispatch(
        &self,
        doc_id: &str,
        parsed: &ParsedCommand,
        secrets: &DocSecrets,
        demo_mode: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        match parsed {
            ParsedCommand::Setup => self.dispatch_setup(doc_id, secrets, demo_mode).await,
            ParsedCommand::Status => Ok(DispatchOutcome::simple(format!(
                "status: ok, chain_a={}",
                secrets.chain_a.address
            ))),
            ParsedCommand::Treasury => self.dispatch_treasury(secrets).await,
            ParsedCommand::Price { pair } => self.dispatch_price(pair.as_deref()).await,
            ParsedCommand::ChainPrice { chain } => self.dispatch_chain_price(chain).await,
            ParsedCommand::Balance => self.dispatch_balance(secrets).await,
            ParsedCommand::ChainBalance { chain } => self.dispatch_chain_balance(chain, secrets).await,
            ParsedCommand::Payout { asset, amount, to } => {
                self.dispatch_payout(asset, amount, to, secrets).await
            }
            ParsedCommand::ChainSend { chain, to, amount } => {
                self.dispatch_chain_send(chain, to, amount, secrets).await
            }
            ParsedCommand::StopLoss {
                base,
                quote,
                trigger_price,
                qty,
            } => {
                self.dispatch_conditional_order_registration("stop-loss", base, quote, trigger_price, qty)
                    .await
            }
            ParsedCommand::TakeProfit {
                base,
                quote,
                trigger_price,
                qty,
            } => {
                self.dispatch_conditional_order_registration(
                    "take-profit",
                    base,
                    quote,
                    trigger_price,
                    qty,
                )
                .await
            }
            ParsedCommand::CancelOrder { order_id } => {
                let mut outcome = DispatchOutcome::simple(format!("order {order_id} cancelled"));
                outcome.cancel_order_id = Some(order_id.clone());
                Ok(outcome)
            }
            ParsedCommand::Schedule {
                interval_hours,
                inner_command_text,
            } => {
                let mut outcome = DispatchOutcome::simple(format!(
                    "schedule registered: every {interval_hours}h run `{inner_command_text}`"
                ));
                outcome.schedule = Some(ScheduleDraft {
                    interval_hours: *interval_hours,
                    inner_command_text: inner_command_text.clone(),
                });
                Ok(outcome)
            }
            ParsedCommand::CancelSchedule { schedule_id } => {
                let mut outcome = DispatchOutcome::simple(format!("schedule {schedule_id} cancelled"));
                outcome.cancel_schedule_id = Some(schedule_id.clone());
                Ok(outcome)
            }
            ParsedCommand::Rebalance => {
                Ok(DispatchOutcome::simple("rebalance evaluated: no action required"))
            }
            ParsedCommand::AutoRebalance { on } => {
                let mut outcome = DispatchOutcome::simple(format!(
                    "auto-rebalance turned {}",
                    if *on { "ON" } else { "OFF" }
                ));
                outcome.doc_config_writes =
                    vec![("auto_rebalance".to_string(), if *on { "ON" } else { "OFF" }.to_string())];
                Ok(outcome)
            }
            ParsedCommand::Bridge {
                from_chain,
                to_chain,
                amount,
                dest_addr,
            } => self.dispatch_bridge(from_chain, to_chain, amount, dest_addr).await,
            ParsedCommand::ContractCall {
                chain,
                contract,
                method,
                args,
            } => self.dispatch_contract_call(chain, contract, method, args, secrets).await,
            ParsedCommand::ContractRead {
                chain,
                contract,
                method,
                args,
            } => self.dispatch_contract_read(chain, contract, method, args).await,
            ParsedCommand::AlertThreshold { coin, amount } => {
                let mut outcome =
                    DispatchOutcome::simple(format!("alert threshold set: {coin} @ {amount}"));
                outcome.doc_config_writes = vec![(format!("alert_threshold:{coin}"), amount.clone())];
                Ok(outcome)
            }
        }
    }

    async fn dispatch_setup(
        &self,
        doc_id: &str,
        secrets: &DocSecrets,
        demo_mode: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !secrets.chain_a.address.is_empty() {
            return Ok(DispatchOutcome::simple(format!(
                "treasury already set up for {}",
                secrets.chain_a.address
            )));
        }

        // Auto-provisioning (spec.md §4.5): the wallet is the precondition
        // resource SETUP exists to create. Idempotent — re-invoked SETUPs
        // short-circuit above once `secrets.chain_a.address` is populated.
        let chain_a = ChainKeypair {
            address: format!("addr-{doc_id}"),
            private_key: format!("key-{doc_id}"),
        };
        // A secondary-chain wallet is only provisioned when chain_b is
        // actually wired; otherwise there is nothing for it to address.
        let chain_b = self.ports.chain_b.is_some().then(|| ChainKeypair {
            address: format!("addr-b-{doc_id}"),
            private_key: format!("key-b-{doc_id}"),
        });

        let mut audit_lines = vec![format!("provisioned chain_a wallet {}", chain_a.address)];
        if let Some(b) = &chain_b {
            audit_lines.push(format!("provisioned chain_b wallet {}", b.address));
        }
        let mut tx_ref = None;

        if demo_mode {
            if let Some(faucet) = &self.ports.faucet {
                let outcome = faucet.request(&chain_a.address).await?;
                audit_lines.push(format!("faucet funded {} ({})", chain_a.address, outcome.tx_ref));
                tx_ref = Some(outcome.tx_ref);
            }
        }

        // spec.md §8 scenario 1: `result_text = "EVM=<addr_a> <SECONDARY>=<addr_b>"`
        // and the Config table gets `EVM_ADDRESS`/`STATUS=READY`.
        let result_text = match &chain_b {
            Some(b) => format!("EVM={} SECONDARY={}", chain_a.address, b.address),
            None => format!("EVM={}", chain_a.address),
        };
        let doc_config_writes = vec![
            ("EVM_ADDRESS".to_string(), chain_a.address.clone()),
            ("STATUS".to_string(), "READY".to_string()),
        ];

        let provisioned = DocSecrets { chain_a, chain_b };

        Ok(DispatchOutcome {
            result_text,
            tx_ref,
            provisioned_secrets: Some(provisioned),
            conditional_order: None,
            schedule: None,
            cancel_order_id: None,
            cancel_schedule_id: None,
            doc_config_writes,
            audit_lines,
        })
    }

    async fn dispatch_treasury(&self, secrets: &DocSecrets) -> Result<DispatchOutcome, DispatchError> {
        let mut parts = Vec::new();
        if let Some(port) = &self.ports.chain_a {
            let balance = port.get_balance(&secrets.chain_a.address).await?;
            parts.push(format!("CHAIN_A {} {}", balance.asset, balance.amount));
        }
        if let (Some(port), Some(keypair)) = (&self.ports.chain_b, &secrets.chain_b) {
            let balance = port.get_balance(&keypair.address).await?;
            parts.push(format!("CHAIN_B {} {}", balance.asset, balance.amount));
        }
        if let Some(port) = &self.ports.stablecoin {
            let balance = port.get_balance(&secrets.chain_a.address).await?;
            parts.push(format!("STABLECOIN {} {}", balance.asset, balance.amount));
        }
        if parts.is_empty() {
            return Err(DispatchError::PortDisabled("chain_a".to_string()));
        }
        Ok(DispatchOutcome::simple(format!("treasury: {}", parts.join(", "))))
    }

    async fn dispatch_balance(&self, secrets: &DocSecrets) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_a
            .as_ref()
            .ok_or_else(|| DispatchError::PortDisabled("chain_a".to_string()))?;
        let balance = port.get_balance(&secrets.chain_a.address).await?;
        Ok(DispatchOutcome::simple(format!(
            "{} {}",
            balance.asset, balance.amount
        )))
    }

    async fn dispatch_chain_balance(
        &self,
        chain: &str,
        secrets: &DocSecrets,
    ) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_port(chain)
            .ok_or_else(|| DispatchError::PortDisabled(chain.to_string()))?;
        let addr = chain_address(chain, secrets)?;
        let balance = port.get_balance(&addr).await?;
        Ok(DispatchOutcome::simple(format!(
            "{} {} {}",
            chain, balance.asset, balance.amount
        )))
    }

    async fn dispatch_price(&self, pair: Option<&str>) -> Result<DispatchOutcome, DispatchError> {
        let pair = pair.unwrap_or("CHAIN_A/USD");
        let quote = self.fetch_price(pair).await?;
        Ok(DispatchOutcome::simple(format!(
            "{} mid={} ({})",
            quote.pair, quote.mid, quote.source
        )))
    }

    async fn dispatch_chain_price(&self, chain: &str) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_port(chain)
            .ok_or_else(|| DispatchError::PortDisabled(chain.to_string()))?;
        let quote = port.get_price().await?;
        Ok(DispatchOutcome::simple(format!(
            "{} mid={} ({})",
            quote.pair, quote.mid, quote.source
        )))
    }

    /// Fetches a price from the primary source, falling back to the
    /// secondary `MarketData` source on failure or a zero mid (spec.md
    /// §4.7.7). Shared by the price dispatch arm and by `dw-engine`'s price
    /// tick (re-exported via [`Self::fetch_price`]).
    pub async fn fetch_price(&self, pair: &str) -> Result<dw_schemas::PriceQuote, DispatchError> {
        if let Some(primary) = &self.ports.primary_price {
            match primary.get_price(pair).await {
                Ok(quote) if quote.mid != 0.0 => return Ok(quote),
                _ => {}
            }
        }
        if let Some(secondary) = &self.ports.secondary_price {
            return Ok(secondary.get_price(pair).await?);
        }
        Err(DispatchError::PortDisabled("price".to_string()))
    }

    async fn dispatch_payout(
        &self,
        asset: &str,
        amount: &str,
        to: &str,
        secrets: &DocSecrets,
    ) -> Result<DispatchOutcome, DispatchError> {
        if let Some(port) = &self.ports.stablecoin {
            let outcome = port.transfer(&secrets.chain_a.private_key, to, amount).await?;
            return Ok(DispatchOutcome::with_tx(
                format!("paid out {amount} {asset} to {to}"),
                outcome.tx_ref,
            ));
        }
        let port = self
            .ports
            .chain_a
            .as_ref()
            .ok_or_else(|| DispatchError::PortDisabled("chain_a".to_string()))?;
        let outcome = port.send_native(&secrets.chain_a.private_key, to, amount).await?;
        Ok(DispatchOutcome::with_tx(
            format!("paid out {amount} {asset} to {to}"),
            outcome.tx_ref,
        ))
    }

    async fn dispatch_chain_send(
        &self,
        chain: &str,
        to: &str,
        amount: &str,
        secrets: &DocSecrets,
    ) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_port(chain)
            .ok_or_else(|| DispatchError::PortDisabled(chain.to_string()))?;
        let priv_key = chain_private_key(chain, secrets)?;
        let outcome = port.send_native(&priv_key, to, amount).await?;
        Ok(DispatchOutcome::with_tx(
            format!("sent {amount} on {chain} to {to}"),
            outcome.tx_ref,
        ))
    }

    async fn dispatch_conditional_order_registration(
        &self,
        label: &str,
        base: &str,
        quote: &str,
        trigger_price: &str,
        qty: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let trigger_price_f: f64 = trigger_price
            .parse()
            .map_err(|_| DispatchError::Execution(format!("invalid trigger price: {trigger_price}")))?;
        let qty_f: f64 = qty
            .parse()
            .map_err(|_| DispatchError::Execution(format!("invalid quantity: {qty}")))?;

        let pair = format!("{base}/{quote}");
        let current = self.fetch_price(&pair).await.ok();
        let mut result_text = format!("{label} registered: sell {qty} {base} if {quote} price crosses {trigger_price}");
        if let Some(quote) = &current {
            result_text.push_str(&format!(" (current mid={})", quote.mid));
        }

        let order_type = if label == "stop-loss" {
            dw_schemas::ConditionalOrderType::StopLoss
        } else {
            dw_schemas::ConditionalOrderType::TakeProfit
        };

        Ok(DispatchOutcome {
            result_text,
            tx_ref: None,
            provisioned_secrets: None,
            conditional_order: Some(ConditionalOrderDraft {
                order_type,
                base: base.to_string(),
                quote: quote.to_string(),
                trigger_price: trigger_price_f,
                qty: qty_f,
            }),
            schedule: None,
            cancel_order_id: None,
            cancel_schedule_id: None,
            doc_config_writes: Vec::new(),
            audit_lines: Vec::new(),
        })
    }

    async fn dispatch_bridge(
        &self,
        from_chain: &str,
        to_chain: &str,
        amount: &str,
        dest_addr: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .bridge
            .as_ref()
            .ok_or_else(|| DispatchError::PortDisabled("bridge".to_string()))?;
        let receipt = port.bridge(from_chain, to_chain, amount, dest_addr).await?;
        Ok(DispatchOutcome::with_tx(
            format!("bridged {amount} from {from_chain} to {to_chain}: {:?}", receipt.status),
            receipt.source_tx_ref,
        ))
    }

    async fn dispatch_contract_call(
        &self,
        chain: &str,
        contract: &str,
        method: &str,
        args: &[String],
        secrets: &DocSecrets,
    ) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_port(chain)
            .ok_or_else(|| DispatchError::PortDisabled(chain.to_string()))?;
        let priv_key = chain_private_key(chain, secrets)?;
        let args_value = json!(args);
        let result = port.contract_call(&priv_key, contract, method, &args_value).await?;
        let result_text = format!("called {contract}.{method} on {chain}");
        match result.tx_ref {
            Some(tx_ref) => Ok(DispatchOutcome::with_tx(result_text, tx_ref)),
            None => Ok(DispatchOutcome::simple(result_text)),
        }
    }

    async fn dispatch_contract_read(
        &self,
        chain: &str,
        contract: &str,
        method: &str,
        args: &[String],
    ) -> Result<DispatchOutcome, DispatchError> {
        let port = self
            .ports
            .chain_port(chain)
            .ok_or_else(|| DispatchError::PortDisabled(chain.to_string()))?;
        let args_value = json!(args);
        let result = port.contract_read(contract, method, &args_value).await?;
        Ok(DispatchOutcome::simple(format!(
            "{contract}.{method} on {chain} -> {}",
            result.return_value.unwrap_or(serde_json::Value::Null)
        )))
    }
}

fn chain_address(chain: &str, secrets: &DocSecrets) -> Result<String, DispatchError> {
    match chain.to_ascii_uppercase().as_str() {
        "CHAIN_A" => Ok(secrets.chain_a.address.clone()),
        "CHAIN_B" => secrets
            .chain_b
            .as_ref()
            .map(|k| k.address.clone())
            .ok_or_else(|| DispatchError::Precondition("chain_b wallet not set up".to_string())),
        other => Err(DispatchError::PortDisabled(other.to_string())),
    }
}

fn chain_private_key(chain: &str, secrets: &DocSecrets) -> Result<String, DispatchError> {
    match chain.to_ascii_uppercase().as_str() {
        "CHAIN_A" => Ok(secrets.chain_a.private_key.clone()),
        "CHAIN_B" => secrets
            .chain_b
            .as_ref()
            .map(|k| k.private_key.clone())
            .ok_or_else(|| DispatchError::Precondition("chain_b wallet not set up".to_string())),
        other => Err(DispatchError::PortDisabled(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_ports::{PaperBridgePort, PaperChainPort, PaperFaucetPort, PaperPricePort, PaperStablecoinPort};
    use std::sync::Arc;

    fn empty_secrets() -> DocSecrets {
        DocSecrets {
            chain_a: ChainKeypair {
                address: String::new(),
                private_key: String::new(),
            },
            chain_b: None,
        }
    }

    fn set_up_secrets() -> DocSecrets {
        DocSecrets {
            chain_a: ChainKeypair {
                address: "addr-doc-1".to_string(),
                private_key: "key-doc-1".to_string(),
            },
            chain_b: None,
        }
    }

    #[tokio::test]
    async fn setup_on_unprovisioned_doc_creates_secrets() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Setup, &empty_secrets(), false)
            .await
            .unwrap();
        assert!(outcome.provisioned_secrets.is_some());
        assert!(outcome.result_text.contains("addr-doc-1"));
    }

    #[tokio::test]
    async fn setup_is_idempotent_once_provisioned() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Setup, &set_up_secrets(), false)
            .await
            .unwrap();
        assert!(outcome.provisioned_secrets.is_none());
        assert!(outcome.result_text.contains("already set up"));
    }

    #[tokio::test]
    async fn setup_in_demo_mode_requests_faucet_funds() {
        let mut registry = PortRegistry::new();
        registry.faucet = Some(Arc::new(PaperFaucetPort::new("100")));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Setup, &empty_secrets(), true)
            .await
            .unwrap();
        assert!(outcome.tx_ref.is_some());
        assert_eq!(outcome.audit_lines.len(), 2);
    }

    #[tokio::test]
    async fn setup_result_text_and_config_writes_match_spec_format() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Setup, &empty_secrets(), false)
            .await
            .unwrap();
        assert_eq!(outcome.result_text, "EVM=addr-doc-1");
        assert_eq!(
            outcome.doc_config_writes,
            vec![
                ("EVM_ADDRESS".to_string(), "addr-doc-1".to_string()),
                ("STATUS".to_string(), "READY".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn setup_with_chain_b_wired_provisions_secondary_wallet() {
        let mut registry = PortRegistry::new();
        registry.chain_b = Some(Arc::new(PaperChainPort::new("CHAIN_B")));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Setup, &empty_secrets(), false)
            .await
            .unwrap();
        assert_eq!(outcome.result_text, "EVM=addr-doc-1 SECONDARY=addr-b-doc-1");
        let secrets = outcome.provisioned_secrets.unwrap();
        assert_eq!(secrets.chain_b.unwrap().address, "addr-b-doc-1");
    }

    #[tokio::test]
    async fn schedule_dispatch_produces_a_schedule_draft() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::Schedule {
                    interval_hours: 6,
                    inner_command_text: "DW STATUS".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        let draft = outcome.schedule.expect("Schedule command must produce a ScheduleDraft");
        assert_eq!(draft.interval_hours, 6);
        assert_eq!(draft.inner_command_text, "DW STATUS");
    }

    #[tokio::test]
    async fn cancel_order_dispatch_sets_cancel_order_id() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::CancelOrder {
                    order_id: "order-1".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        assert_eq!(outcome.cancel_order_id.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn cancel_schedule_dispatch_sets_cancel_schedule_id() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::CancelSchedule {
                    schedule_id: "sched-1".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        assert_eq!(outcome.cancel_schedule_id.as_deref(), Some("sched-1"));
    }

    #[tokio::test]
    async fn chain_send_with_disabled_port_is_port_disabled() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let err = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::ChainSend {
                    chain: "CHAIN_A".to_string(),
                    to: "addr-2".to_string(),
                    amount: "5".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::PortDisabled(_)));
    }

    #[tokio::test]
    async fn chain_send_with_unknown_chain_is_port_disabled() {
        let mut registry = PortRegistry::new();
        registry.chain_a = Some(Arc::new(PaperChainPort::new("CHAIN_A")));
        let dispatcher = Dispatcher::new(registry);
        let err = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::ChainSend {
                    chain: "CHAIN_Z".to_string(),
                    to: "addr-2".to_string(),
                    amount: "5".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::PortDisabled(_)));
    }

    #[tokio::test]
    async fn chain_send_with_wired_port_returns_tx_ref() {
        let mut registry = PortRegistry::new();
        registry.chain_a = Some(Arc::new(PaperChainPort::new("CHAIN_A")));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::ChainSend {
                    chain: "CHAIN_A".to_string(),
                    to: "addr-2".to_string(),
                    amount: "5".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        assert!(outcome.tx_ref.is_some());
    }

    #[tokio::test]
    async fn bridge_without_port_is_disabled() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let err = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::Bridge {
                    from_chain: "CHAIN_A".to_string(),
                    to_chain: "CHAIN_B".to_string(),
                    amount: "1".to_string(),
                    dest_addr: "addr".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::PortDisabled(_)));
    }

    #[tokio::test]
    async fn bridge_with_port_succeeds() {
        let mut registry = PortRegistry::new();
        registry.bridge = Some(Arc::new(PaperBridgePort::new()));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::Bridge {
                    from_chain: "CHAIN_A".to_string(),
                    to_chain: "CHAIN_B".to_string(),
                    amount: "1".to_string(),
                    dest_addr: "addr".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        assert!(outcome.tx_ref.is_some());
    }

    #[tokio::test]
    async fn price_falls_back_to_secondary_on_zero_mid_primary() {
        let mut registry = PortRegistry::new();
        let primary = PaperPricePort::new("primary");
        primary.set_price("CHAIN_A/USD", 0.0);
        registry.primary_price = Some(Arc::new(primary));
        let secondary = PaperPricePort::new("secondary");
        secondary.set_price("CHAIN_A/USD", 3.0);
        registry.secondary_price = Some(Arc::new(secondary));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Price { pair: None }, &set_up_secrets(), false)
            .await
            .unwrap();
        assert!(outcome.result_text.contains("mid=3"));
    }

    #[tokio::test]
    async fn payout_prefers_stablecoin_port_over_native_send() {
        let mut registry = PortRegistry::new();
        registry.stablecoin = Some(Arc::new(PaperStablecoinPort::new("USDC")));
        registry.chain_a = Some(Arc::new(PaperChainPort::new("CHAIN_A")));
        let dispatcher = Dispatcher::new(registry);
        let outcome = dispatcher
            .dispatch(
                "doc-1",
                &ParsedCommand::Payout {
                    asset: "USDC".to_string(),
                    amount: "10".to_string(),
                    to: "addr-2".to_string(),
                },
                &set_up_secrets(),
                false,
            )
            .await
            .unwrap();
        assert!(outcome.tx_ref.unwrap().contains("transfer"));
    }

    #[tokio::test]
    async fn rebalance_with_no_parameters_is_a_no_op_confirmation() {
        let dispatcher = Dispatcher::new(PortRegistry::new());
        let outcome = dispatcher
            .dispatch("doc-1", &ParsedCommand::Rebalance, &set_up_secrets(), false)
            .await
            .unwrap();
        assert!(outcome.result_text.contains("no action"));
        assert!(outcome.tx_ref.is_none());
    }
}
