//! DB-backed transition-rule tests.
//!
//! Ignored by default because they require a Postgres instance reachable
//! via DOCWALLET_DATABASE_URL.
//!
//! Run:
//!   DOCWALLET_DATABASE_URL=... cargo test -p dw-repo --test scenario_command_transition_rules_enforced -- --ignored

use chrono::Utc;
use dw_repo::Repo;
use dw_schemas::{Command, CommandStatus, Document};

async fn fresh_doc(repo: &Repo, doc_id: &str) {
    repo.upsert_doc(&Document {
        doc_id: doc_id.to_string(),
        display_name: "test doc".to_string(),
        primary_address: None,
        secondary_address: None,
        last_user_hash: None,
        poll_failure_count: 0,
    })
    .await
    .expect("upsert doc");
}

fn fresh_command(doc_id: &str, cmd_id: &str) -> Command {
    let now = Utc::now();
    Command {
        cmd_id: cmd_id.to_string(),
        doc_id: doc_id.to_string(),
        raw_command: "DW STATUS".to_string(),
        parsed_json: None,
        status: CommandStatus::PendingApproval,
        tx_ref: None,
        result_text: None,
        error_text: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[ignore]
async fn approved_to_executing_is_a_cas_gate() {
    let pool = dw_repo::testkit_db_pool().await.expect("db pool");
    let repo = Repo::new(pool);
    let doc_id = "doc-cas-test";
    fresh_doc(&repo, doc_id).await;

    let cmd_id = "cmd-cas-test";
    sqlx::query("delete from commands where cmd_id = $1")
        .bind(cmd_id)
        .execute(repo.pool())
        .await
        .unwrap();

    let mut cmd = fresh_command(doc_id, cmd_id);
    cmd.status = CommandStatus::Approved;
    repo.insert_command(&cmd).await.expect("insert");

    repo.set_command_status(cmd_id, CommandStatus::Executing, None, None)
        .await
        .expect("first transition to EXECUTING succeeds");

    let second = repo
        .set_command_status(cmd_id, CommandStatus::Executing, None, None)
        .await;
    assert!(second.is_err(), "second concurrent transition must lose the CAS race");
}

#[tokio::test]
#[ignore]
async fn terminal_command_rejects_further_transitions() {
    let pool = dw_repo::testkit_db_pool().await.expect("db pool");
    let repo = Repo::new(pool);
    let doc_id = "doc-terminal-test";
    fresh_doc(&repo, doc_id).await;

    let cmd_id = "cmd-terminal-test";
    sqlx::query("delete from commands where cmd_id = $1")
        .bind(cmd_id)
        .execute(repo.pool())
        .await
        .unwrap();

    let mut cmd = fresh_command(doc_id, cmd_id);
    cmd.status = CommandStatus::Approved;
    repo.insert_command(&cmd).await.expect("insert");
    repo.set_command_status(cmd_id, CommandStatus::Executing, None, None)
        .await
        .expect("to EXECUTING");
    repo.set_command_status(cmd_id, CommandStatus::Executed, Some("ok"), None)
        .await
        .expect("to EXECUTED");

    let edit = repo
        .reparse_command(cmd_id, "DW STATUS NOW", None, CommandStatus::PendingApproval)
        .await;
    assert!(edit.is_err(), "editing a terminal command must be rejected");
}
