//! Project team membership
//!
//! Every project has exactly one `project_creator` row for its owner, added
//! when the project is created. Other users are invited by email and join
//! the team once they accept.
//!
//! # Lifecycle
//!
//! ```text
//! invite → pending → accepted
//!        ↘ removed (by the owner or the invitee)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name of the unique constraint on `(project_id, user_id)`
pub const UNIQUE_MEMBER_CONSTRAINT: &str = "team_members_project_user_key";

/// Role on a project team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    /// The project owner; cannot be removed
    ProjectCreator,
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::ProjectCreator => "project_creator",
            TeamRole::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

/// Team member row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub status: InvitationStatus,

    /// Who sent the invitation (None for the creator row, or if that user is gone)
    pub invited_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Team member joined with the member's name and email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeamMemberWithUser {
    #[sqlx(flatten)]
    pub member: TeamMember,
    pub user_name: String,
    pub user_email: String,
}

/// Pending invitation joined with the project name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingInvitation {
    #[sqlx(flatten)]
    pub member: TeamMember,
    pub project_name: String,
}

#[derive(Debug, Clone)]
pub struct CreateTeamMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub status: InvitationStatus,
    pub invited_by: Option<Uuid>,
}

impl CreateTeamMember {
    /// The accepted creator row added with a new project.
    pub fn creator(project_id: Uuid, user_id: Uuid) -> Self {
        Self {
            project_id,
            user_id,
            role: TeamRole::ProjectCreator,
            status: InvitationStatus::Accepted,
            invited_by: None,
        }
    }

    /// A pending invitation.
    pub fn invitation(project_id: Uuid, user_id: Uuid, role: TeamRole, invited_by: Uuid) -> Self {
        Self {
            project_id,
            user_id,
            role,
            status: InvitationStatus::Pending,
            invited_by: Some(invited_by),
        }
    }
}

impl TeamMember {
    pub fn is_creator(&self) -> bool {
        self.role == TeamRole::ProjectCreator
    }

    pub fn is_accepted(&self) -> bool {
        self.status == InvitationStatus::Accepted
    }

    pub async fn create<'e, E>(executor: E, data: CreateTeamMember) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (project_id, user_id, role, status, invited_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, user_id, role, status, invited_by, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .bind(data.status)
        .bind(data.invited_by)
        .fetch_one(executor)
        .await
    }

    /// Finds a member row by id, scoped to its project.
    pub async fn find_in_project<'e, E>(
        executor: E,
        project_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, project_id, user_id, role, status, invited_by, created_at, updated_at
            FROM team_members
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(member_id)
        .bind(project_id)
        .fetch_optional(executor)
        .await
    }

    /// A user's membership on a project, pending or accepted.
    pub async fn find_membership<'e, E>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT id, project_id, user_id, role, status, invited_by, created_at, updated_at
            FROM team_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Members of a project with their user details; creator first, then by join date.
    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Vec<TeamMemberWithUser>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMemberWithUser>(
            r#"
            SELECT tm.id, tm.project_id, tm.user_id, tm.role, tm.status, tm.invited_by,
                   tm.created_at, tm.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM team_members tm
            JOIN users u ON u.id = tm.user_id
            WHERE tm.project_id = $1
            ORDER BY (tm.role = 'project_creator') DESC, tm.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Invitations waiting on the user, newest first.
    pub async fn list_pending_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<PendingInvitation>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PendingInvitation>(
            r#"
            SELECT tm.id, tm.project_id, tm.user_id, tm.role, tm.status, tm.invited_by,
                   tm.created_at, tm.updated_at,
                   p.name AS project_name
            FROM team_members tm
            JOIN projects p ON p.id = tm.project_id
            WHERE tm.user_id = $1 AND tm.status = 'pending'
            ORDER BY tm.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Writes role and status back.
    pub async fn save<'e, E>(&self, executor: E) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE team_members
            SET role = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, user_id, role, status, invited_by, created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(self.role)
        .bind(self.status)
        .fetch_one(executor)
        .await
    }

    /// Accepts a pending invitation addressed to `user_id`.
    ///
    /// Returns `None` if the row does not exist, belongs to someone else or
    /// is not pending.
    pub async fn accept<'e, E>(
        executor: E,
        project_id: Uuid,
        member_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE team_members
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND project_id = $2 AND user_id = $3 AND status = 'pending'
            RETURNING id, project_id, user_id, role, status, invited_by, created_at, updated_at
            "#,
        )
        .bind(member_id)
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
