use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dw_schemas::{Command, CommandStatus};

use crate::{Repo, RepoError};

fn status_from_text(s: &str) -> CommandStatus {
    match s {
        "INVALID" => CommandStatus::Invalid,
        "PENDING_APPROVAL" => CommandStatus::PendingApproval,
        "APPROVED" => CommandStatus::Approved,
        "EXECUTING" => CommandStatus::Executing,
        "EXECUTED" => CommandStatus::Executed,
        "FAILED" => CommandStatus::Failed,
        "REJECTED" => CommandStatus::Rejected,
        other => panic!("unknown command status in repository row: {other}"),
    }
}

type CommandRowTuple = (
    String,
    String,
    String,
    Option<serde_json::Value>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_to_command(row: CommandRowTuple) -> Command {
    let (cmd_id, doc_id, raw_command, parsed_json, status, tx_ref, result_text, error_text, created_at, updated_at) =
        row;
    Command {
        cmd_id,
        doc_id,
        raw_command,
        parsed_json,
        status: status_from_text(&status),
        tx_ref,
        result_text,
        error_text,
        created_at,
        updated_at,
    }
}

const COMMAND_COLUMNS: &str =
    "cmd_id, doc_id, raw_command, parsed_json, status, tx_ref, result_text, error_text, created_at, updated_at";

impl Repo {
    /// Inserts a brand-new command row. The initial status must have no
    /// predecessor per the transition table (`None -> to`).
    pub async fn insert_command(&self, cmd: &Command) -> Result<(), RepoError> {
        if !CommandStatus::can_transition(None, cmd.status) {
            return Err(RepoError::IllegalTransition(format!(
                "cannot create command {} directly in status {:?}",
                cmd.cmd_id, cmd.status
            )));
        }
        sqlx::query(
            r#"
            insert into commands (cmd_id, doc_id, raw_command, parsed_json, status, tx_ref, result_text, error_text, created_at, updated_at)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&cmd.cmd_id)
        .bind(&cmd.doc_id)
        .bind(&cmd.raw_command)
        .bind(&cmd.parsed_json)
        .bind(cmd.status.as_cell_text())
        .bind(&cmd.tx_ref)
        .bind(&cmd.result_text)
        .bind(&cmd.error_text)
        .bind(cmd.created_at)
        .bind(cmd.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_command(&self, cmd_id: &str) -> Result<Option<Command>, RepoError> {
        let row: Option<CommandRowTuple> = sqlx::query_as(&format!(
            "select {COMMAND_COLUMNS} from commands where cmd_id = $1"
        ))
        .bind(cmd_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_command))
    }

    /// Commands currently APPROVED for one document — the spec's
    /// `listPendingCommands(docId)`, named for what the query actually
    /// returns rather than its spec-given name.
    pub async fn list_approved_commands(&self, doc_id: &str) -> Result<Vec<Command>, RepoError> {
        let rows: Vec<CommandRowTuple> = sqlx::query_as(&format!(
            "select {COMMAND_COLUMNS} from commands where doc_id = $1 and status = 'APPROVED' order by created_at asc"
        ))
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_command).collect())
    }

    /// FIFO-by-`created_at` oldest APPROVED command across all documents,
    /// feeding the executor tick's per-tick scan (spec.md §4.7.3).
    pub async fn get_next_approved_command(&self) -> Result<Option<Command>, RepoError> {
        let row: Option<CommandRowTuple> = sqlx::query_as(&format!(
            "select {COMMAND_COLUMNS} from commands where status = 'APPROVED' order by created_at asc limit 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_command))
    }

    /// Next `limit` APPROVED commands oldest-first, for the executor's
    /// bounded per-tick budget.
    pub async fn list_next_approved_commands(&self, limit: i64) -> Result<Vec<Command>, RepoError> {
        let rows: Vec<CommandRowTuple> = sqlx::query_as(&format!(
            "select {COMMAND_COLUMNS} from commands where status = 'APPROVED' order by created_at asc limit $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_command).collect())
    }

    /// Enforces the transition table in spec.md §4.1. The `APPROVED ->
    /// EXECUTING` transition is additionally a CAS: the `where status =
    /// $from` clause makes exactly one concurrent caller win (I3).
    pub async fn set_command_status(
        &self,
        cmd_id: &str,
        to: CommandStatus,
        result_text: Option<&str>,
        error_text: Option<&str>,
    ) -> Result<(), RepoError> {
        let current = self
            .get_command(cmd_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("command {cmd_id}")))?;

        if !CommandStatus::can_transition(Some(current.status), to) {
            return Err(RepoError::IllegalTransition(format!(
                "command {cmd_id}: {:?} -> {:?} is not permitted",
                current.status, to
            )));
        }

        let result = sqlx::query(
            r#"
            update commands
            set status = $3, result_text = coalesce($4, result_text), error_text = coalesce($5, error_text), updated_at = now()
            where cmd_id = $1 and status = $2
            "#,
        )
        .bind(cmd_id)
        .bind(current.status.as_cell_text())
        .bind(to.as_cell_text())
        .bind(result_text)
        .bind(error_text)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::IllegalTransition(format!(
                "command {cmd_id}: status changed concurrently, transition to {to:?} lost the race"
            )));
        }
        Ok(())
    }

    /// Updates `raw_command`/`parsed_json` together with a status
    /// transition, used by the poll tick's re-parse-on-edit path. Rejects
    /// edits to terminal commands with [`RepoError::IllegalTransition`] so
    /// the caller can surface "locked after approval/execution" (I2).
    pub async fn reparse_command(
        &self,
        cmd_id: &str,
        raw_command: &str,
        parsed_json: Option<serde_json::Value>,
        to: CommandStatus,
    ) -> Result<(), RepoError> {
        let current = self
            .get_command(cmd_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("command {cmd_id}")))?;

        if current.status.is_terminal() {
            return Err(RepoError::IllegalTransition(
                "locked after approval/execution".to_string(),
            ));
        }
        if !CommandStatus::can_transition(Some(current.status), to) {
            return Err(RepoError::IllegalTransition(format!(
                "command {cmd_id}: {:?} -> {:?} is not permitted",
                current.status, to
            )));
        }

        sqlx::query(
            "update commands set raw_command = $2, parsed_json = $3, status = $4, updated_at = now() where cmd_id = $1",
        )
        .bind(cmd_id)
        .bind(raw_command)
        .bind(parsed_json)
        .bind(to.as_cell_text())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_command_execution_ids(
        &self,
        cmd_id: &str,
        tx_ref: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query("update commands set tx_ref = $2, updated_at = now() where cmd_id = $1")
            .bind(cmd_id)
            .bind(tx_ref)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_recent_commands(&self, doc_id: &str, n: i64) -> Result<Vec<Command>, RepoError> {
        let rows: Vec<CommandRowTuple> = sqlx::query_as(&format!(
            "select {COMMAND_COLUMNS} from commands where doc_id = $1 order by created_at desc limit $2"
        ))
        .bind(doc_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_command).collect())
    }

    /// Global counts by status, across every document, for the approval
    /// surface's `GET /api/status` (spec.md §6: "returns counters").
    pub async fn count_commands_by_status(&self) -> Result<Vec<(CommandStatus, i64)>, RepoError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("select status, count(*) from commands group by status")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(status, count)| (status_from_text(&status), count))
            .collect())
    }

    /// Force-transitions commands that have sat in APPROVED or EXECUTING
    /// longer than `older_than` to FAILED with `"stale"` (spec.md §4.7.3
    /// step 5, §9 "unfinished commands remain in EXECUTING — the stale
    /// sweep on the next startup moves them to FAILED", §8 scenario 6
    /// "Restart mid-execute"). Staleness is measured from `updated_at` (the
    /// time the command last entered its current status), not
    /// `created_at` — a command can sit PENDING_APPROVAL for a long time
    /// and must not be swept the instant it's approved. Returns the swept
    /// `cmd_id`s so the caller can mirror + audit each one.
    pub async fn fail_stale_approved_commands(
        &self,
        older_than: ChronoDuration,
    ) -> Result<Vec<String>, RepoError> {
        let cutoff = Utc::now() - older_than;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            update commands
            set status = 'FAILED', error_text = 'stale', updated_at = now()
            where status in ('APPROVED', 'EXECUTING') and updated_at < $1
            returning cmd_id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
