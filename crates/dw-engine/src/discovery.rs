//! Discovery tick (spec.md §4.7.1): enumerate accessible documents, track
//! new ones, drop ones no longer visible. Template-load batches of ≤4
//! (spec.md §5 backpressure) to avoid rate-limiting the document backend.

use std::collections::BTreeSet;
use std::sync::Arc;

use dw_schemas::Document;
use futures_util::future::join_all;

use crate::context::TickContext;

const TEMPLATE_LOAD_BATCH_SIZE: usize = 4;

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    let discovered = ctx.document.discover().await?;

    let tracked: Vec<_> = match &ctx.config.pinned_doc_id {
        Some(pinned) => discovered
            .into_iter()
            .filter(|d| &d.doc_id == pinned)
            .collect(),
        None => discovered,
    };

    for batch in tracked.chunks(TEMPLATE_LOAD_BATCH_SIZE) {
        let outcomes = join_all(batch.iter().map(|doc| {
            let ctx = ctx.clone();
            let doc_id = doc.doc_id.clone();
            async move { ctx.document.ensure_template(&doc_id).await }
        }))
        .await;
        for (doc, outcome) in batch.iter().zip(outcomes) {
            if let Err(e) = outcome {
                tracing::warn!(doc_id = %doc.doc_id, error = %e, "ensure_template failed, will retry next discovery fire");
                continue;
            }
            ctx.repo
                .upsert_doc(&Document {
                    doc_id: doc.doc_id.clone(),
                    display_name: doc.display_name.clone(),
                    primary_address: None,
                    secondary_address: None,
                    last_user_hash: None,
                    poll_failure_count: 0,
                })
                .await?;
        }
    }

    let discovered_ids: BTreeSet<&str> = tracked.iter().map(|d| d.doc_id.as_str()).collect();
    for existing in ctx.repo.list_docs().await? {
        if !discovered_ids.contains(existing.doc_id.as_str()) {
            ctx.repo.remove_doc(&existing.doc_id).await?;
            tracing::info!(doc_id = %existing.doc_id, "document no longer visible, dropped from tracking");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_config::{DwConfig, PortConfig, PortTable};
    use dw_dispatcher::{Dispatcher, PortRegistry};
    use dw_document::InMemoryDocumentBackend;
    use dw_repo::Repo;
    use dw_vault::MasterKey;
    use std::collections::BTreeSet as StdBTreeSet;
    use std::time::Duration;

    fn test_config() -> Arc<DwConfig> {
        Arc::new(DwConfig {
            master_key: "test".to_string(),
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
            auto_approve_kinds: StdBTreeSet::new(),
            executor_batch_size: 5,
            stale_sweep_threshold: Duration::from_secs(3600),
            poll_failure_limit: 10,
            intervals: dw_config::TickIntervals::default(),
            shutdown_drain_timeout: Duration::from_secs(30),
        })
    }

    async fn test_ctx_with(document: Arc<InMemoryDocumentBackend>) -> (Arc<TickContext>, sqlx::PgPool) {
        let pool = dw_repo::testkit_db_pool()
            .await
            .expect("DOCWALLET_DATABASE_URL must point at a disposable test database");
        let ctx = Arc::new(TickContext::new(
            Repo::new(pool.clone()),
            document,
            Arc::new(Dispatcher::new(PortRegistry::new())),
            MasterKey::derive("test-key"),
            test_config(),
        ));
        (ctx, pool)
    }

    #[tokio::test]
    #[ignore = "requires DOCWALLET_DATABASE_URL"]
    async fn discovery_tracks_new_docs_and_drops_gone_ones() {
        let backend = Arc::new(InMemoryDocumentBackend::new());
        backend.seed_document("doc-1", "Treasury Sheet").await;
        let (ctx, _pool) = test_ctx_with(backend.clone()).await;

        run(ctx.clone()).await.unwrap();
        let docs = ctx.repo.list_docs().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].doc_id, "doc-1");

        backend.forget_document("doc-1").await;
        run(ctx.clone()).await.unwrap();
        assert!(ctx.repo.list_docs().await.unwrap().is_empty());
    }
}
