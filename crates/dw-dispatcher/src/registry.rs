//! Wiring point for every optional integration port (spec.md §4.4: "any
//! port may be absent at runtime"). Held as `Option<Arc<dyn Trait>>` per
//! capability so a process can run with only the ports it has credentials
//! for, mirroring `mqk-execution::gateway::BrokerGateway` owning exactly one
//! broker but generalized to the fixed capability set here.

use std::sync::Arc;

use dw_ports::{BridgePort, ChainPort, FaucetPort, PricePort, StablecoinPort, StateChannelPort};

#[derive(Clone, Default)]
pub struct PortRegistry {
    pub chain_a: Option<Arc<dyn ChainPort>>,
    pub chain_b: Option<Arc<dyn ChainPort>>,
    pub stablecoin: Option<Arc<dyn StablecoinPort>>,
    pub bridge: Option<Arc<dyn BridgePort>>,
    /// The price tick's primary source (spec.md §4.7.7).
    pub primary_price: Option<Arc<dyn PricePort>>,
    /// The optional `MarketData` secondary source, bound to the same
    /// `PricePort` trait as the primary (SPEC_FULL.md §4.4).
    pub secondary_price: Option<Arc<dyn PricePort>>,
    pub state_channel: Option<Arc<dyn StateChannelPort>>,
    pub faucet: Option<Arc<dyn FaucetPort>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the chain-named port for a `<CHAIN>_*` verb (spec.md §6).
    /// Recognizes `CHAIN_A`/`CHAIN_B` case-insensitively; anything else is
    /// "disabled" since only two chain slots exist in the fixed port set.
    pub fn chain_port(&self, chain: &str) -> Option<&Arc<dyn ChainPort>> {
        match chain.to_ascii_uppercase().as_str() {
            "CHAIN_A" => self.chain_a.as_ref(),
            "CHAIN_B" => self.chain_b.as_ref(),
            _ => None,
        }
    }
}
