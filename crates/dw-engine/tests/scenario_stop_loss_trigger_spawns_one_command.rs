//! Scenario (spec.md §8.4): a StopLoss order whose trigger price is crossed
//! spawns exactly one Command and flips the order ACTIVE -> TRIGGERED
//! (I5, P6). A second price tick at the same (or lower) price must not
//! spawn a second command.
//!
//! The order itself is created by driving an APPROVED `DW STOP_LOSS`
//! command through `executor::run`, the same path a real user's command
//! takes, rather than inserting the ConditionalOrder row directly.
//!
//! Ignored by default because it requires a Postgres instance reachable via
//! `DOCWALLET_DATABASE_URL`. Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-engine --test scenario_stop_loss_trigger_spawns_one_command -- --ignored

mod common;

use std::sync::Arc;

use chrono::Utc;
use dw_dispatcher::PortRegistry;
use dw_engine::{executor, price};
use dw_ports::{PaperChainPort, PaperPricePort};
use dw_schemas::{ChainKeypair, Command, CommandStatus, DocSecrets, ParsedCommand};

#[tokio::test]
#[ignore = "requires DOCWALLET_DATABASE_URL"]
async fn stop_loss_trigger_spawns_exactly_one_command() {
    let price_port = Arc::new(PaperPricePort::new("paper"));
    price_port.set_price("CHAIN_A/USD", 8.0); // below the 10.0 trigger

    let mut registry = PortRegistry::new();
    registry.primary_price = Some(price_port.clone());
    registry.chain_a = Some(Arc::new(PaperChainPort::new("CHAIN_A")));

    let (ctx, _backend) = common::build_ctx(registry).await;

    ctx.store_secrets(
        common::DOC_ID,
        &DocSecrets {
            chain_a: ChainKeypair {
                address: "addr-scenario".to_string(),
                private_key: "key-scenario".to_string(),
            },
            chain_b: None,
        },
    )
    .await
    .unwrap();

    let now = Utc::now();
    let cmd = Command {
        cmd_id: "cmd-stop-1".to_string(),
        doc_id: common::DOC_ID.to_string(),
        raw_command: "DW STOP_LOSS CHAIN_A USD 10.0 5.0".to_string(),
        parsed_json: Some(
            serde_json::to_value(&ParsedCommand::StopLoss {
                base: "CHAIN_A".to_string(),
                quote: "USD".to_string(),
                trigger_price: "10.0".to_string(),
                qty: "5.0".to_string(),
            })
            .unwrap(),
        ),
        status: CommandStatus::Approved,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await.unwrap();

    executor::run(ctx.clone()).await.unwrap();

    let registered = ctx.repo.get_command("cmd-stop-1").await.unwrap().unwrap();
    assert_eq!(registered.status, CommandStatus::Executed);

    let active = ctx.repo.list_active_conditional_orders(Some(common::DOC_ID)).await.unwrap();
    assert_eq!(active.len(), 1, "STOP_LOSS must register exactly one active order");

    price::run(ctx.clone()).await.unwrap();

    let commands_after_first = ctx.repo.list_recent_commands(common::DOC_ID, 10).await.unwrap();
    assert_eq!(
        commands_after_first.len(),
        2,
        "the STOP_LOSS registration plus exactly one spawned command"
    );

    let active_after_trigger = ctx.repo.list_active_conditional_orders(Some(common::DOC_ID)).await.unwrap();
    assert!(active_after_trigger.is_empty(), "the order must leave ACTIVE once triggered");

    // A second fire at the same depressed price must not spawn a second command.
    price::run(ctx.clone()).await.unwrap();
    let commands_after_second = ctx.repo.list_recent_commands(common::DOC_ID, 10).await.unwrap();
    assert_eq!(commands_after_second.len(), 2, "a triggered order must never re-trigger");
}
