//! dw-daemon entry point.
//!
//! This file is intentionally thin: it resolves configuration, connects the
//! repository, wires the document backend/ports/dispatcher into a
//! [`dw_engine::TickContext`], starts the nine-tick scheduler alongside the
//! approval HTTP surface, and drives both to a coordinated graceful
//! shutdown. All route handlers live in `routes.rs`; all shared state types
//! live in `state.rs`. Grounded on `mqk-daemon::main`'s boot sequence.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use dw_config::DwConfig;
use dw_daemon::{routes, state::AppState};
use dw_dispatcher::{Dispatcher, PortRegistry};
use dw_document::InMemoryDocumentBackend;
use dw_engine::TickScheduler;
use dw_ports::{
    HttpChainPort, PaperBridgePort, PaperChainPort, PaperFaucetPort, PaperPricePort,
    PaperStablecoinPort, PaperStateChannelPort,
};
use dw_repo::Repo;
use dw_vault::MasterKey;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = Arc::new(DwConfig::from_env().map_err(|e| anyhow::anyhow!(e))?);

    let pool = dw_repo::connect_from_env().await?;
    dw_repo::migrate(&pool).await?;
    let repo = Repo::new(pool);

    // No external document-service adapter exists in this workspace yet
    // (spec.md names no specific one); the in-memory backend is the only
    // concrete `DocumentBackend` available, same as `dw-engine`'s own tests.
    let document = Arc::new(InMemoryDocumentBackend::new());

    let dispatcher = Arc::new(Dispatcher::new(build_port_registry(&config)));
    let vault = MasterKey::derive(&config.master_key);

    let ctx = Arc::new(dw_engine::TickContext::new(
        repo,
        document,
        dispatcher,
        vault,
        config.clone(),
    ));

    let scheduler = Arc::new(TickScheduler::new(ctx.clone()));
    let tick_status = scheduler.status();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    let app_state = AppState::new(ctx.clone(), tick_status);
    let app = routes::build_router(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!("dw-daemon listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received, draining ticks");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("server crashed")?;

    scheduler_handle.await.context("scheduler task panicked")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Builds the port registry from `DwConfig::ports` (spec.md §4.4, §6 "per-port
/// enable flags and endpoints"): a chain slot with an endpoint gets the live
/// HTTP adapter; an enabled slot with no endpoint (demo mode) gets the
/// deterministic paper adapter; a disabled slot stays `None`.
fn build_port_registry(config: &DwConfig) -> PortRegistry {
    let mut registry = PortRegistry::new();

    registry.chain_a = chain_port(&config.ports.chain_a, "CHAIN_A");
    registry.chain_b = chain_port(&config.ports.chain_b, "CHAIN_B");

    if config.ports.stablecoin.enabled {
        registry.stablecoin = Some(Arc::new(PaperStablecoinPort::new("STABLE")));
    }
    if config.ports.bridge.enabled {
        registry.bridge = Some(Arc::new(PaperBridgePort::new()));
    }
    if config.ports.chain_a.enabled {
        registry.primary_price = Some(Arc::new(PaperPricePort::new("primary")));
    }
    if config.ports.market_data.enabled {
        registry.secondary_price = Some(Arc::new(PaperPricePort::new("market_data")));
    }
    if config.ports.state_channel.enabled {
        registry.state_channel = Some(Arc::new(PaperStateChannelPort::new()));
    }
    if config.ports.faucet.enabled && config.demo_mode {
        registry.faucet = Some(Arc::new(PaperFaucetPort::new("100")));
    }

    registry
}

fn chain_port(port: &dw_config::PortConfig, name: &'static str) -> Option<Arc<dyn dw_ports::ChainPort>> {
    if !port.enabled {
        return None;
    }
    match &port.endpoint {
        Some(endpoint) => Some(Arc::new(HttpChainPort::new(name, endpoint.clone()))),
        None => Some(Arc::new(PaperChainPort::new(name))),
    }
}

/// CORS: allow only localhost origins, matching the teacher's dev posture —
/// spec.md's Non-goals explicitly exclude user authentication design.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
