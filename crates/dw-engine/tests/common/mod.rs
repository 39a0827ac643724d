//! Shared scaffolding for the scenario tests (spec.md §8's six concrete
//! scenarios). Every scenario needs a `DOCWALLET_DATABASE_URL`-backed
//! repository plus an in-memory document backend seeded with one document;
//! building that by hand in every file would just be copy-paste, so it
//! lives here once, the same way `dw-engine::executor`'s own test module
//! builds its context.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dw_config::{DwConfig, PortConfig, PortTable, TickIntervals};
use dw_dispatcher::{Dispatcher, PortRegistry};
use dw_document::InMemoryDocumentBackend;
use dw_engine::context::TickContext;
use dw_repo::Repo;
use dw_vault::MasterKey;

pub const DOC_ID: &str = "doc-scenario";

pub fn test_config() -> Arc<DwConfig> {
    Arc::new(DwConfig {
        master_key: "scenario-test-key".to_string(),
        pinned_doc_id: None,
        name_prefix: None,
        discover_all: true,
        public_base_url: "http://localhost:8080".to_string(),
        http_port: 8080,
        demo_mode: false,
        ports: PortTable {
            chain_a: PortConfig::default(),
            chain_b: PortConfig::default(),
            stablecoin: PortConfig::default(),
            bridge: PortConfig::default(),
            market_data: PortConfig::default(),
            state_channel: PortConfig::default(),
            faucet: PortConfig::default(),
        },
        auto_approve_kinds: BTreeSet::new(),
        executor_batch_size: 5,
        stale_sweep_threshold: Duration::from_secs(3600),
        poll_failure_limit: 10,
        intervals: TickIntervals::default(),
        shutdown_drain_timeout: Duration::from_secs(30),
    })
}

/// Builds a fresh `TickContext` against a disposable test database, with
/// one seeded document (`DOC_ID`) and whatever ports the caller wires into
/// `registry`.
pub async fn build_ctx(registry: PortRegistry) -> (Arc<TickContext>, Arc<InMemoryDocumentBackend>) {
    let pool = dw_repo::testkit_db_pool()
        .await
        .expect("DOCWALLET_DATABASE_URL must point at a disposable test database");
    let repo = Repo::new(pool);
    repo.upsert_doc(&dw_schemas::Document {
        doc_id: DOC_ID.to_string(),
        display_name: "Scenario Treasury".to_string(),
        primary_address: None,
        secondary_address: None,
        last_user_hash: None,
        poll_failure_count: 0,
    })
    .await
    .expect("seed document in repository");

    let backend = Arc::new(InMemoryDocumentBackend::new());
    backend.seed_document(DOC_ID, "Scenario Treasury").await;

    let ctx = Arc::new(TickContext::new(
        repo,
        backend.clone(),
        Arc::new(Dispatcher::new(registry)),
        MasterKey::derive("scenario-test-key"),
        test_config(),
    ));
    (ctx, backend)
}
