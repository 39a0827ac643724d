//! Scenario (spec.md §8.2): editing the COMMAND cell of an already-EXECUTED
//! row must not reopen it. The poll tick writes "Command locked after
//! approval/execution" into the ERROR cell and leaves the repository
//! record untouched (I2: terminal states write-once).
//!
//! Ignored by default because it requires a Postgres instance reachable via
//! `DOCWALLET_DATABASE_URL`. Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-engine --test scenario_edit_after_execution_is_locked -- --ignored

mod common;

use chrono::Utc;
use dw_dispatcher::PortRegistry;
use dw_document::DocumentBackend;
use dw_engine::poll;
use dw_schemas::{Command, CommandStatus, CommandRow, ParsedCommand};

#[tokio::test]
#[ignore = "requires DOCWALLET_DATABASE_URL"]
async fn edit_after_execution_is_locked() {
    let (ctx, backend) = common::build_ctx(PortRegistry::new()).await;

    let now = Utc::now();
    let cmd = Command {
        cmd_id: "cmd-executed-1".to_string(),
        doc_id: common::DOC_ID.to_string(),
        raw_command: "DW STATUS".to_string(),
        parsed_json: Some(serde_json::to_value(&ParsedCommand::Status).unwrap()),
        status: CommandStatus::Approved,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await.unwrap();
    ctx.repo
        .set_command_status(&cmd.cmd_id, CommandStatus::Executing, None, None)
        .await
        .unwrap();
    ctx.repo
        .set_command_status(&cmd.cmd_id, CommandStatus::Executed, Some("status: ok"), None)
        .await
        .unwrap();

    backend
        .append_command_row(
            common::DOC_ID,
            CommandRow {
                cmd_id: cmd.cmd_id.clone(),
                raw_command: "DW BALANCE".to_string(), // user edits the cell after the fact
                status: "EXECUTED".to_string(),
                approval_url: String::new(),
                result: "status: ok".to_string(),
                error: String::new(),
            },
        )
        .await
        .unwrap();

    poll::run(ctx.clone()).await.unwrap();

    let untouched = ctx.repo.get_command(&cmd.cmd_id).await.unwrap().unwrap();
    assert_eq!(untouched.status, CommandStatus::Executed);
    assert_eq!(untouched.raw_command, "DW STATUS", "repository record must not move once terminal");

    let tables = backend.load_tables(common::DOC_ID).await.unwrap();
    let row = tables
        .commands
        .iter()
        .find(|r| r.cmd_id == cmd.cmd_id)
        .expect("row still present");
    assert_eq!(row.error, "Command locked after approval/execution");
}
