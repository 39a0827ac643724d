use chrono::{DateTime, Utc};
use dw_schemas::{Schedule, ScheduleStatus};

use crate::{Repo, RepoError};

fn status_from_text(s: &str) -> ScheduleStatus {
    match s {
        "ACTIVE" => ScheduleStatus::Active,
        "CANCELLED" => ScheduleStatus::Cancelled,
        other => panic!("unknown schedule status in repository row: {other}"),
    }
}

type ScheduleRowTuple = (String, String, i32, String, DateTime<Utc>, i64, String);

fn row_to_schedule(row: ScheduleRowTuple) -> Schedule {
    let (schedule_id, doc_id, interval_hours, inner_command_text, next_run_at, total_runs, status) = row;
    Schedule {
        schedule_id,
        doc_id,
        interval_hours,
        inner_command_text,
        next_run_at,
        total_runs,
        status: status_from_text(&status),
    }
}

const SCHEDULE_COLUMNS: &str =
    "schedule_id, doc_id, interval_hours, inner_command_text, next_run_at, total_runs, status";

impl Repo {
    pub async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            insert into schedules (schedule_id, doc_id, interval_hours, inner_command_text, next_run_at, total_runs, status)
            values ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&schedule.schedule_id)
        .bind(&schedule.doc_id)
        .bind(schedule.interval_hours)
        .bind(&schedule.inner_command_text)
        .bind(schedule.next_run_at)
        .bind(schedule.total_runs)
        .bind(match schedule.status {
            ScheduleStatus::Active => "ACTIVE",
            ScheduleStatus::Cancelled => "CANCELLED",
        })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_schedule(&self, schedule_id: &str) -> Result<Option<Schedule>, RepoError> {
        let row: Option<ScheduleRowTuple> = sqlx::query_as(&format!(
            "select {SCHEDULE_COLUMNS} from schedules where schedule_id = $1"
        ))
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_schedule))
    }

    pub async fn list_due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, RepoError> {
        let rows: Vec<ScheduleRowTuple> = sqlx::query_as(&format!(
            "select {SCHEDULE_COLUMNS} from schedules where status = 'ACTIVE' and next_run_at <= $1 order by next_run_at asc"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_schedule).collect())
    }

    /// Advances `next_run_at` by `interval_hours` and increments
    /// `total_runs` by exactly one, in a single statement so both fields
    /// move together (I4, P5).
    pub async fn advance_schedule(&self, schedule_id: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            update schedules
            set next_run_at = next_run_at + (interval_hours || ' hours')::interval,
                total_runs = total_runs + 1
            where schedule_id = $1 and status = 'ACTIVE'
            "#,
        )
        .bind(schedule_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!(
                "active schedule {schedule_id}"
            )));
        }
        Ok(())
    }

    pub async fn cancel_schedule(&self, schedule_id: &str) -> Result<(), RepoError> {
        sqlx::query("update schedules set status = 'CANCELLED' where schedule_id = $1")
            .bind(schedule_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
