//! Tasks
//!
//! Each task belongs to one project and may claim part of its budget. The
//! budget rule itself lives in `crate::budget`; this module provides the
//! sibling sum it needs (`Task::allocated_budget`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::str::FromStr;
use uuid::Uuid;

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Parses the wire form used in paths and query strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown task status '{}'", s))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,

    /// Share of the project budget, in minor units
    pub budget: i64,

    pub assigned_user_id: Option<Uuid>,
    pub created_by: Uuid,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub budget: i64,
    pub assigned_user_id: Option<Uuid>,
    pub created_by: Uuid,
    pub due_date: Option<NaiveDate>,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    /// Moves the task to another project
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub budget: Option<i64>,
    pub assigned_user_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl Task {
    pub fn apply(&mut self, changes: UpdateTask) {
        if let Some(project_id) = changes.project_id {
            self.project_id = project_id;
        }
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(budget) = changes.budget {
            self.budget = budget;
        }
        if let Some(assigned_user_id) = changes.assigned_user_id {
            self.assigned_user_id = assigned_user_id;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
    }

    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, title, description, status, priority, budget,
                               assigned_user_id, created_by, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, project_id, title, description, status, priority, budget,
                      assigned_user_id, created_by, due_date, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.budget)
        .bind(data.assigned_user_id)
        .bind(data.created_by)
        .bind(data.due_date)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, priority, budget,
                   assigned_user_id, created_by, due_date, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Locks the task row until the transaction ends.
    pub async fn find_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, priority, budget,
                   assigned_user_id, created_by, due_date, created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn save<'e, E>(&self, executor: E) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET project_id = $2,
                title = $3,
                description = $4,
                status = $5,
                priority = $6,
                budget = $7,
                assigned_user_id = $8,
                due_date = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, title, description, status, priority, budget,
                      assigned_user_id, created_by, due_date, created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(self.project_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.status)
        .bind(self.priority)
        .bind(self.budget)
        .bind(self.assigned_user_id)
        .bind(self.due_date)
        .fetch_one(executor)
        .await
    }

    /// Deletes a task together with its time log and comments.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tasks of one project, soonest due first.
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, priority, budget,
                   assigned_user_id, created_by, due_date, created_at, updated_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY due_date ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Tasks in every project the user can see, optionally filtered by status.
    pub async fn list_visible_to<'e, E>(
        executor: E,
        user_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.priority,
                   t.budget, t.assigned_user_id, t.created_by, t.due_date,
                   t.created_at, t.updated_at
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE (
                p.created_by = $1
                OR EXISTS (
                    SELECT 1 FROM team_members tm
                    WHERE tm.project_id = p.id
                      AND tm.user_id = $1
                      AND tm.status = 'accepted'
                )
            )
            AND ($2::task_status IS NULL OR t.status = $2)
            ORDER BY t.due_date ASC NULLS LAST, t.created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(executor)
        .await
    }

    /// Sum of task budgets in a project, leaving out `excluding` if given.
    ///
    /// Pass the id of the task being updated so its current budget does not
    /// count against its own new budget.
    pub async fn allocated_budget<'e, E>(
        executor: E,
        project_id: Uuid,
        excluding: Option<Uuid>,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(budget), 0)::BIGINT
            FROM tasks
            WHERE project_id = $1
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(project_id)
        .bind(excluding)
        .fetch_one(executor)
        .await
    }
}
