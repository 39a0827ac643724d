//! Scenario (spec.md §8.5): a due Schedule fires, spawning a new Command
//! row prefixed `[SCHED:<id>#<run>]`, and atomically advances
//! `total_runs`/`next_run_at` together (I4, P5).
//!
//! The schedule itself is created by driving an APPROVED `DW SCHEDULE`
//! command through `executor::run`, the same path a real user's command
//! takes, rather than inserting the Schedule row directly.
//!
//! Ignored by default because it requires a Postgres instance reachable via
//! `DOCWALLET_DATABASE_URL`. Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-engine --test scenario_schedule_emission_advances_next_run -- --ignored

mod common;

use chrono::Utc;
use dw_dispatcher::PortRegistry;
use dw_document::DocumentBackend;
use dw_engine::{executor, scheduler};
use dw_schemas::{Command, CommandStatus, ParsedCommand};

#[tokio::test]
#[ignore = "requires DOCWALLET_DATABASE_URL"]
async fn schedule_emission_advances_next_run() {
    let (ctx, backend) = common::build_ctx(PortRegistry::new()).await;

    // interval_hours: 0 makes the freshly-minted schedule immediately due,
    // so the very next scheduler tick picks it up without backdating rows.
    let now = Utc::now();
    let cmd = Command {
        cmd_id: "cmd-sched-1".to_string(),
        doc_id: common::DOC_ID.to_string(),
        raw_command: "DW SCHEDULE EVERY 0h: DW STATUS".to_string(),
        parsed_json: Some(
            serde_json::to_value(&ParsedCommand::Schedule {
                interval_hours: 0,
                inner_command_text: "DW STATUS".to_string(),
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

    let executed = ctx.repo.get_command("cmd-sched-1").await.unwrap().unwrap();
    assert_eq!(executed.status, CommandStatus::Executed);
    let result_text = executed.result_text.expect("SCHEDULE must report a result");
    let schedule_id = result_text
        .rsplit("[schedule_id=")
        .next()
        .and_then(|s| s.strip_suffix(']'))
        .expect("result_text must carry [schedule_id=...]")
        .to_string();

    let created = ctx.repo.get_schedule(&schedule_id).await.unwrap().unwrap();
    assert_eq!(created.total_runs, 0);
    assert_eq!(created.interval_hours, 0);
    let due_at = created.next_run_at;

    scheduler::run(ctx.clone()).await.unwrap();

    let advanced = ctx.repo.get_schedule(&schedule_id).await.unwrap().unwrap();
    assert_eq!(advanced.total_runs, 1);
    assert!(advanced.next_run_at >= due_at, "next_run_at must move forward by interval_hours");

    let commands = ctx.repo.list_recent_commands(common::DOC_ID, 10).await.unwrap();
    assert_eq!(commands.len(), 2, "the SCHEDULE command plus its one spawned run");
    assert!(commands
        .iter()
        .any(|c| c.raw_command.starts_with(&format!("[SCHED:{schedule_id}#1]"))));

    let tables = backend.load_tables(common::DOC_ID).await.unwrap();
    assert_eq!(tables.commands.len(), 2, "the spawned row must also land on the document");
}
