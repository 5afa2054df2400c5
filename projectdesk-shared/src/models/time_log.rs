//! Time logs
//!
//! A task has at most one time log. The API checks for an existing log
//! before inserting; the `time_logs_task_id_key` unique constraint catches
//! whatever races past that check. A log with no `end_time` is a running
//! timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name of the unique constraint on `time_logs.task_id`
pub const UNIQUE_TASK_CONSTRAINT: &str = "time_logs_task_id_key";

/// Time log row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeLog {
    pub id: Uuid,
    pub task_id: Uuid,

    /// Who logged the time
    pub user_id: Uuid,

    pub start_time: DateTime<Utc>,

    /// None while the timer is running
    pub end_time: Option<DateTime<Utc>>,

    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTimeLog {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct UpdateTimeLog {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub description: Option<Option<String>>,
}

/// `end >= start` when an end is set.
pub fn interval_is_valid(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
    end.map_or(true, |end| end >= start)
}

impl TimeLog {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole minutes logged; a running timer counts up to `now`.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_minutes().max(0)
    }

    pub fn has_valid_interval(&self) -> bool {
        interval_is_valid(self.start_time, self.end_time)
    }

    pub fn apply(&mut self, changes: UpdateTimeLog) {
        if let Some(start_time) = changes.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = changes.end_time {
            self.end_time = end_time;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
    }

    /// Inserts the time log for a task.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on [`UNIQUE_TASK_CONSTRAINT`] if the task
    /// already has one.
    pub async fn create<'e, E>(executor: E, data: CreateTimeLog) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TimeLog>(
            r#"
            INSERT INTO time_logs (task_id, user_id, start_time, end_time, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, user_id, start_time, end_time, description,
                      created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_task<'e, E>(
        executor: E,
        task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TimeLog>(
            r#"
            SELECT id, task_id, user_id, start_time, end_time, description,
                   created_at, updated_at
            FROM time_logs
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists_for_task<'e, E>(executor: E, task_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM time_logs WHERE task_id = $1)")
            .bind(task_id)
            .fetch_one(executor)
            .await
    }

    pub async fn save<'e, E>(&self, executor: E) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TimeLog>(
            r#"
            UPDATE time_logs
            SET start_time = $2,
                end_time = $3,
                description = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, task_id, user_id, start_time, end_time, description,
                      created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(self.start_time)
        .bind(self.end_time)
        .bind(&self.description)
        .fetch_one(executor)
        .await
    }

    /// Stops the running timer of a task at `at`.
    ///
    /// Returns `None` when the task has no log or the log is already stopped.
    /// An `at` earlier than the start is clamped to the start.
    pub async fn stop<'e, E>(
        executor: E,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TimeLog>(
            r#"
            UPDATE time_logs
            SET end_time = GREATEST($2, start_time),
                updated_at = NOW()
            WHERE task_id = $1 AND end_time IS NULL
            RETURNING id, task_id, user_id, start_time, end_time, description,
                      created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(at)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM time_logs WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every time log of every task in a project.
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TimeLog>(
            r#"
            SELECT l.id, l.task_id, l.user_id, l.start_time, l.end_time, l.description,
                   l.created_at, l.updated_at
            FROM time_logs l
            JOIN tasks t ON t.id = l.task_id
            WHERE t.project_id = $1
            ORDER BY l.start_time ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }
}
