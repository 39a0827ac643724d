//! Scenario (spec.md §8.1): a brand-new `DW SETUP` command, once APPROVED,
//! executes to completion, provisions a wallet, and persists the secret
//! bundle so a later poll sees the document as set up.
//!
//! Ignored by default because it requires a Postgres instance reachable via
//! `DOCWALLET_DATABASE_URL`. Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-engine --test scenario_first_setup_executes_and_provisions_secrets -- --ignored

mod common;

use chrono::Utc;
use dw_dispatcher::PortRegistry;
use dw_engine::executor;
use dw_schemas::{Command, CommandStatus, ParsedCommand};

#[tokio::test]
#[ignore = "requires DOCWALLET_DATABASE_URL"]
async fn first_setup_executes_and_provisions_secrets() {
    let (ctx, _backend) = common::build_ctx(PortRegistry::new()).await;

    let now = Utc::now();
    let cmd = Command {
        cmd_id: "cmd-setup-1".to_string(),
        doc_id: common::DOC_ID.to_string(),
        raw_command: "DW SETUP".to_string(),
        parsed_json: Some(serde_json::to_value(&ParsedCommand::Setup).unwrap()),
        status: CommandStatus::Approved,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await.unwrap();

    executor::run(ctx.clone()).await.unwrap();

    let executed = ctx.repo.get_command("cmd-setup-1").await.unwrap().unwrap();
    assert_eq!(executed.status, CommandStatus::Executed);
    assert!(executed.result_text.unwrap().contains("addr-doc-scenario"));

    let secrets = ctx
        .load_secrets(common::DOC_ID)
        .await
        .unwrap()
        .expect("SETUP must persist a secret bundle (I6)");
    assert_eq!(secrets.chain_a.address, "addr-doc-scenario");
    assert!(!secrets.chain_a.private_key.is_empty());
}
