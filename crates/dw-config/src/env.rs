//! Process-wide configuration resolved once at startup from the environment
//! (spec.md §6 "Configuration"). Mirrors `mqk-config::secrets`'s contract:
//! config is read here and only here; no other crate calls `std::env::var`.

use std::collections::BTreeSet;
use std::time::Duration;

use dw_schemas::CommandKindTag;

/// Per-integration-port enablement and endpoint, keyed by the port's name
/// as used in env var names (e.g. `CHAIN_A`, `BRIDGE`, `FAUCET`).
#[derive(Debug, Clone, Default)]
pub struct PortConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
}

/// Resolved configuration for one process instantiation. Built once via
/// [`DwConfig::from_env`] and passed down; never scattered `env::var` calls.
#[derive(Clone)]
pub struct DwConfig {
    /// Master key material for [`dw_vault`]-level encryption. Redacted in Debug.
    pub master_key: String,
    pub pinned_doc_id: Option<String>,
    pub name_prefix: Option<String>,
    pub discover_all: bool,
    pub public_base_url: String,
    pub http_port: u16,
    pub demo_mode: bool,
    pub ports: PortTable,
    pub auto_approve_kinds: BTreeSet<CommandKindTag>,
    pub executor_batch_size: usize,
    pub stale_sweep_threshold: Duration,
    pub poll_failure_limit: u32,
    pub intervals: TickIntervals,
    /// Hard cap on draining in-flight ticks during graceful shutdown (spec.md §4.6).
    pub shutdown_drain_timeout: Duration,
}

/// Per-tick fire intervals (spec.md §4.6: "typical values" per tick, all
/// independently configurable).
#[derive(Debug, Clone)]
pub struct TickIntervals {
    pub discovery: Duration,
    pub poll: Duration,
    pub executor: Duration,
    pub chat: Duration,
    pub balances: Duration,
    pub scheduler: Duration,
    pub price: Duration,
    pub agent_decision: Duration,
    pub payout_rules: Duration,
}

impl Default for TickIntervals {
    fn default() -> Self {
        TickIntervals {
            discovery: Duration::from_secs(600),
            poll: Duration::from_secs(5),
            executor: Duration::from_secs(3),
            chat: Duration::from_secs(5),
            balances: Duration::from_secs(60),
            scheduler: Duration::from_secs(30),
            price: Duration::from_secs(15),
            agent_decision: Duration::from_secs(60),
            payout_rules: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortTable {
    pub chain_a: PortConfig,
    pub chain_b: PortConfig,
    pub stablecoin: PortConfig,
    pub bridge: PortConfig,
    pub market_data: PortConfig,
    pub state_channel: PortConfig,
    pub faucet: PortConfig,
}

impl std::fmt::Debug for DwConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DwConfig")
            .field("master_key", &"<REDACTED>")
            .field("pinned_doc_id", &self.pinned_doc_id)
            .field("name_prefix", &self.name_prefix)
            .field("discover_all", &self.discover_all)
            .field("public_base_url", &self.public_base_url)
            .field("http_port", &self.http_port)
            .field("demo_mode", &self.demo_mode)
            .field("ports", &self.ports)
            .field("auto_approve_kinds", &self.auto_approve_kinds)
            .field("executor_batch_size", &self.executor_batch_size)
            .field("stale_sweep_threshold", &self.stale_sweep_threshold)
            .field("poll_failure_limit", &self.poll_failure_limit)
            .field("intervals", &self.intervals)
            .field("shutdown_drain_timeout", &self.shutdown_drain_timeout)
            .finish()
    }
}

/// Default per-tick executor budget (spec.md §9: "5 in one variant… make it
/// configurable with a documented default").
pub const DEFAULT_EXECUTOR_BATCH_SIZE: usize = 5;

/// Default stale-sweep threshold for APPROVED commands (spec.md §4.7.3).
pub const DEFAULT_STALE_SWEEP: Duration = Duration::from_secs(3600);

/// Consecutive poll failures before a document is dropped from tracking
/// (spec.md §4.7.2, §8 boundary behaviour).
pub const DEFAULT_POLL_FAILURE_LIMIT: u32 = 10;

impl DwConfig {
    /// Resolves the full process configuration from the environment. The
    /// single required variable is `DOCWALLET_MASTER_KEY`; everything else
    /// has a conservative default.
    pub fn from_env() -> Result<DwConfig, String> {
        let master_key = resolve_env("DOCWALLET_MASTER_KEY")
            .ok_or_else(|| "DOCWALLET_MASTER_KEY is not set or empty".to_string())?;

        let demo_mode = resolve_bool("DEMO_MODE", false);

        let auto_approve_kinds = resolve_env("DOCWALLET_AUTO_APPROVE_KINDS")
            .map(|raw| parse_auto_approve_kinds(&raw))
            .unwrap_or_else(|| CommandKindTag::DEFAULT_AUTO_APPROVE.iter().copied().collect());

        let executor_batch_size = resolve_env("DOCWALLET_EXECUTOR_BATCH_SIZE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EXECUTOR_BATCH_SIZE);

        let stale_sweep_threshold = resolve_env("DOCWALLET_STALE_SWEEP_SECONDS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STALE_SWEEP);

        let poll_failure_limit = resolve_env("DOCWALLET_POLL_FAILURE_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_FAILURE_LIMIT);

        let shutdown_drain_timeout = resolve_env("DOCWALLET_SHUTDOWN_DRAIN_SECONDS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(DwConfig {
            master_key,
            pinned_doc_id: resolve_env("DOCWALLET_DOC_ID"),
            name_prefix: resolve_env("DOCWALLET_NAME_PREFIX"),
            discover_all: resolve_bool("DOCWALLET_DISCOVER_ALL", false),
            public_base_url: resolve_env("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            http_port: resolve_env("HTTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            demo_mode,
            ports: resolve_port_table(),
            auto_approve_kinds,
            executor_batch_size,
            stale_sweep_threshold,
            poll_failure_limit,
            intervals: resolve_tick_intervals(),
            shutdown_drain_timeout,
        })
    }

    /// Whether a faucet auto-fund on SETUP is permitted (spec.md §9: gated
    /// strictly on demo mode, the more conservative of the observed variants).
    pub fn faucet_auto_fund_allowed(&self) -> bool {
        self.demo_mode && self.ports.faucet.enabled
    }

    pub fn is_auto_approved(&self, kind: CommandKindTag) -> bool {
        self.demo_mode || self.auto_approve_kinds.contains(&kind)
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn resolve_bool(var_name: &str, default: bool) -> bool {
    match resolve_env(var_name) {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn resolve_port(prefix: &str) -> PortConfig {
    PortConfig {
        enabled: resolve_bool(&format!("{prefix}_ENABLED"), false),
        endpoint: resolve_env(&format!("{prefix}_ENDPOINT")),
    }
}

fn resolve_port_table() -> PortTable {
    PortTable {
        chain_a: resolve_port("CHAIN_A"),
        chain_b: resolve_port("CHAIN_B"),
        stablecoin: resolve_port("STABLECOIN"),
        bridge: resolve_port("BRIDGE"),
        market_data: resolve_port("MARKET_DATA"),
        state_channel: resolve_port("STATE_CHANNEL"),
        faucet: resolve_port("FAUCET"),
    }
}

fn resolve_interval(var_name: &str, default: Duration) -> Duration {
    resolve_env(var_name)
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn resolve_tick_intervals() -> TickIntervals {
    let default = TickIntervals::default();
    TickIntervals {
        discovery: resolve_interval("DOCWALLET_INTERVAL_DISCOVERY_SECONDS", default.discovery),
        poll: resolve_interval("DOCWALLET_INTERVAL_POLL_SECONDS", default.poll),
        executor: resolve_interval("DOCWALLET_INTERVAL_EXECUTOR_SECONDS", default.executor),
        chat: resolve_interval("DOCWALLET_INTERVAL_CHAT_SECONDS", default.chat),
        balances: resolve_interval("DOCWALLET_INTERVAL_BALANCES_SECONDS", default.balances),
        scheduler: resolve_interval("DOCWALLET_INTERVAL_SCHEDULER_SECONDS", default.scheduler),
        price: resolve_interval("DOCWALLET_INTERVAL_PRICE_SECONDS", default.price),
        agent_decision: resolve_interval("DOCWALLET_INTERVAL_AGENT_DECISION_SECONDS", default.agent_decision),
        payout_rules: resolve_interval("DOCWALLET_INTERVAL_PAYOUT_RULES_SECONDS", default.payout_rules),
    }
}

fn parse_auto_approve_kinds(raw: &str) -> BTreeSet<CommandKindTag> {
    raw.split(',')
        .filter_map(|s| kind_from_str(s.trim()))
        .collect()
}

fn kind_from_str(s: &str) -> Option<CommandKindTag> {
    use CommandKindTag::*;
    Some(match s.to_ascii_uppercase().as_str() {
        "SETUP" => Setup,
        "STATUS" => Status,
        "TREASURY" => Treasury,
        "PRICE" => Price,
        "CHAIN_PRICE" => ChainPrice,
        "BALANCE" => Balance,
        "CHAIN_BALANCE" => ChainBalance,
        "PAYOUT" => Payout,
        "CHAIN_SEND" => ChainSend,
        "STOP_LOSS" => StopLoss,
        "TAKE_PROFIT" => TakeProfit,
        "CANCEL_ORDER" => CancelOrder,
        "SCHEDULE" => Schedule,
        "CANCEL_SCHEDULE" => CancelSchedule,
        "REBALANCE" => Rebalance,
        "AUTO_REBALANCE" => AutoRebalance,
        "BRIDGE" => Bridge,
        "CONTRACT_CALL" => ContractCall,
        "CONTRACT_READ" => ContractRead,
        "ALERT_THRESHOLD" => AlertThreshold,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes env-mutating tests; `std::env::set_var` is process-global.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_requires_master_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("DOCWALLET_MASTER_KEY");
        assert!(DwConfig::from_env().is_err());
    }

    #[test]
    fn demo_mode_forces_auto_approval_of_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DOCWALLET_MASTER_KEY", "test-key");
        std::env::set_var("DEMO_MODE", "true");
        let cfg = DwConfig::from_env().unwrap();
        assert!(cfg.is_auto_approved(CommandKindTag::Bridge));
        std::env::remove_var("DEMO_MODE");
        std::env::remove_var("DOCWALLET_MASTER_KEY");
    }

    #[test]
    fn faucet_autofund_requires_both_demo_mode_and_enabled_port() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("DOCWALLET_MASTER_KEY", "test-key");
        std::env::set_var("DEMO_MODE", "true");
        std::env::remove_var("FAUCET_ENABLED");
        let cfg = DwConfig::from_env().unwrap();
        assert!(!cfg.faucet_auto_fund_allowed());
        std::env::remove_var("DEMO_MODE");
        std::env::remove_var("DOCWALLET_MASTER_KEY");
    }
}
