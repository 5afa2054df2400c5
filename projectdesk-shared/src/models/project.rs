//! Projects
//!
//! A project owns a budget (integer minor units) that its tasks draw from,
//! an optional date range and a status. The creator is the owner; other users
//! join through `team_member` invitations.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE project_status AS ENUM ('not_started', 'in_progress', 'on_hold', 'completed');
//!
//! CREATE TABLE projects (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     description TEXT,
//!     start_date DATE,
//!     end_date DATE,
//!     status project_status NOT NULL DEFAULT 'not_started',
//!     budget BIGINT NOT NULL DEFAULT 0 CHECK (budget >= 0),
//!     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     ...
//! );
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    /// Set by hand only; never derived from dates
    OnHold,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "not_started",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,

    /// Budget in minor units; task budgets in this project sum to at most this
    pub budget: i64,

    /// Owner
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub budget: i64,
    pub created_by: Uuid,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub status: Option<ProjectStatus>,
    pub budget: Option<i64>,
}

impl UpdateProject {
    pub fn changes_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

impl Project {
    /// Merges `changes` into this project.
    ///
    /// When the dates move and no status is given, the status is derived
    /// again from the new range, unless the project is on hold.
    pub fn apply(&mut self, changes: UpdateProject, today: NaiveDate) {
        let rederive = changes.status.is_none()
            && changes.changes_dates()
            && self.status != ProjectStatus::OnHold;

        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(start_date) = changes.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = changes.end_date {
            self.end_date = end_date;
        }
        if let Some(budget) = changes.budget {
            self.budget = budget;
        }

        if let Some(status) = changes.status {
            self.status = status;
        } else if rederive {
            self.status = ProjectStatus::derive(self.start_date, self.end_date, today);
        }
    }

    /// `end_date >= start_date` whenever both are set.
    pub fn has_valid_dates(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => end >= start,
            _ => true,
        }
    }

    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, start_date, end_date, status, budget, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, start_date, end_date, status, budget,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.status)
        .bind(data.budget)
        .bind(data.created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, start_date, end_date, status, budget,
                   created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Same as `find_by_id` but locks the row until the transaction ends.
    pub async fn find_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, start_date, end_date, status, budget,
                   created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Reads the project budget and locks the project row.
    ///
    /// Concurrent task writes against the same project queue up behind this
    /// lock, so their budget checks see each other's allocations.
    pub async fn lock_budget<'e, E>(executor: E, id: Uuid) -> Result<Option<i64>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT budget FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Writes every mutable column back and bumps `updated_at`.
    pub async fn save<'e, E>(&self, executor: E) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2,
                description = $3,
                start_date = $4,
                end_date = $5,
                status = $6,
                budget = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, start_date, end_date, status, budget,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.start_date)
        .bind(self.end_date)
        .bind(self.status)
        .bind(self.budget)
        .fetch_one(executor)
        .await
    }

    /// Deletes a project. Tasks, their time logs and comments, and team
    /// members go with it through `ON DELETE CASCADE`.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Projects the user owns or has accepted an invitation to, newest first.
    pub async fn list_visible_to<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.start_date, p.end_date, p.status,
                   p.budget, p.created_by, p.created_at, p.updated_at
            FROM projects p
            WHERE p.created_by = $1
               OR EXISTS (
                   SELECT 1 FROM team_members tm
                   WHERE tm.project_id = p.id
                     AND tm.user_id = $1
                     AND tm.status = 'accepted'
               )
            ORDER BY p.created_at DESC, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}
