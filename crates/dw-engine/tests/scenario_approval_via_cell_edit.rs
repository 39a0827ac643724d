//! Scenario (spec.md §8.3): a PENDING_APPROVAL command; the user types
//! "APPROVED" into its STATUS cell. After one poll tick the repository
//! record moves to APPROVED with an "(cell-edit)" audit line; after one
//! executor tick it progresses through EXECUTING to EXECUTED.
//!
//! Ignored by default because it requires a Postgres instance reachable via
//! `DOCWALLET_DATABASE_URL`. Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-engine --test scenario_approval_via_cell_edit -- --ignored

mod common;

use chrono::Utc;
use dw_dispatcher::PortRegistry;
use dw_document::DocumentBackend;
use dw_engine::{executor, poll};
use dw_schemas::{Command, CommandRow, CommandStatus, ParsedCommand};

#[tokio::test]
#[ignore = "requires DOCWALLET_DATABASE_URL"]
async fn approval_via_cell_edit_progresses_to_executed() {
    let (ctx, backend) = common::build_ctx(PortRegistry::new()).await;

    let now = Utc::now();
    let cmd = Command {
        cmd_id: "cmd-pending-1".to_string(),
        doc_id: common::DOC_ID.to_string(),
        raw_command: "DW STATUS".to_string(),
        parsed_json: Some(serde_json::to_value(&ParsedCommand::Status).unwrap()),
        status: CommandStatus::PendingApproval,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    };
    ctx.repo.insert_command(&cmd).await.unwrap();
    backend
        .append_command_row(
            common::DOC_ID,
            CommandRow {
                cmd_id: cmd.cmd_id.clone(),
                raw_command: "DW STATUS".to_string(),
                status: "APPROVED".to_string(), // the user's cell edit
                approval_url: String::new(),
                result: String::new(),
                error: String::new(),
            },
        )
        .await
        .unwrap();

    poll::run(ctx.clone()).await.unwrap();

    let approved = ctx.repo.get_command(&cmd.cmd_id).await.unwrap().unwrap();
    assert_eq!(approved.status, CommandStatus::Approved);

    let events = ctx.repo.list_audit_events(common::DOC_ID, 10).await.unwrap();
    assert!(events.iter().any(|e| e.message.contains("(cell-edit)")));

    executor::run(ctx.clone()).await.unwrap();

    let executed = ctx.repo.get_command(&cmd.cmd_id).await.unwrap().unwrap();
    assert_eq!(executed.status, CommandStatus::Executed);
}
