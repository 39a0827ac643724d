//! Integration ports (spec.md §4.4): narrow capability interfaces for chain,
//! stablecoin, bridge, price, state-channel, and faucet access. The
//! dispatcher (`dw-dispatcher`) holds these behind `Option<Arc<dyn Trait>>`
//! and treats an absent port as a precondition failure, never a panic.
//!
//! Grounded on `mqk-execution::order_router::BrokerAdapter` for the trait
//! boundary shape, `mqk-broker-paper::PaperBroker` for the deterministic
//! in-memory implementations in [`paper`], and `mqk-broker-alpaca`'s
//! `reqwest`-based live-adapter shape for [`http`].

pub mod error;
pub mod http;
pub mod paper;
pub mod traits;

pub use error::PortError;
pub use http::HttpChainPort;
pub use paper::{
    PaperBridgePort, PaperChainPort, PaperFaucetPort, PaperPricePort, PaperStablecoinPort,
    PaperStateChannelPort,
};
pub use traits::{BridgePort, ChainPort, FaucetPort, PricePort, StablecoinPort, StateChannelPort};
