//! Project-level access checks
//!
//! Access is decided per project:
//!
//! | Access | Who | May |
//! |---|---|---|
//! | `Owner` | the project's `created_by` | everything |
//! | `Member` | accepted team member | view the project, work on its tasks |
//! | `Invited` | pending team member | see the invitation only |
//! | `None` | anyone else | nothing |
//!
//! # Example
//!
//! ```no_run
//! use projectdesk_shared::auth::authorization::{load_project, require_project_owner};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let (project, access) = load_project(&pool, project_id, user_id).await?;
//! require_project_owner(access)?;
//! println!("{} may edit {}", user_id, project.name);
//! # Ok(())
//! # }
//! ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project::Project;
use crate::models::task::Task;
use crate::models::team_member::{InvitationStatus, TeamMember};

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Unknown project. Also returned for tasks whose project vanished.
    #[error("Project not found")]
    ProjectNotFound,

    #[error("You are not a member of this project")]
    NotProjectMember,

    #[error("Only the project owner can do this")]
    NotProjectOwner,

    #[error("Only the task creator or the project owner can delete this task")]
    NotTaskOwner,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// What a user may do with a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
    Owner,
    Member,
    Invited,
    None,
}

impl ProjectAccess {
    /// Resolves access from the project and the user's team row, if any.
    pub fn resolve(project: &Project, user_id: Uuid, membership: Option<&TeamMember>) -> Self {
        if project.created_by == user_id {
            return ProjectAccess::Owner;
        }

        match membership.map(|m| m.status) {
            Some(InvitationStatus::Accepted) => ProjectAccess::Member,
            Some(InvitationStatus::Pending) => ProjectAccess::Invited,
            None => ProjectAccess::None,
        }
    }

    pub fn can_view(&self) -> bool {
        matches!(self, ProjectAccess::Owner | ProjectAccess::Member)
    }

    pub fn is_owner(&self) -> bool {
        *self == ProjectAccess::Owner
    }
}

/// Looks up the user's access to an already loaded project.
pub async fn project_access(
    pool: &PgPool,
    project: &Project,
    user_id: Uuid,
) -> Result<ProjectAccess, sqlx::Error> {
    if project.created_by == user_id {
        return Ok(ProjectAccess::Owner);
    }

    let membership = TeamMember::find_membership(pool, project.id, user_id).await?;
    Ok(ProjectAccess::resolve(project, user_id, membership.as_ref()))
}

/// Loads a project with the caller's access to it.
///
/// # Errors
///
/// `ProjectNotFound` if the project does not exist.
pub async fn load_project(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(Project, ProjectAccess), AuthzError> {
    let project = Project::find_by_id(pool, project_id)
        .await?
        .ok_or(AuthzError::ProjectNotFound)?;

    let access = project_access(pool, &project, user_id).await?;
    Ok((project, access))
}

pub fn require_project_view(access: ProjectAccess) -> Result<(), AuthzError> {
    if access.can_view() {
        Ok(())
    } else {
        Err(AuthzError::NotProjectMember)
    }
}

pub fn require_project_owner(access: ProjectAccess) -> Result<(), AuthzError> {
    match access {
        ProjectAccess::Owner => Ok(()),
        ProjectAccess::Member => Err(AuthzError::NotProjectOwner),
        ProjectAccess::Invited | ProjectAccess::None => Err(AuthzError::NotProjectMember),
    }
}

/// A task may be deleted by whoever created it or by the project owner.
pub fn require_task_delete(
    task: &Task,
    user_id: Uuid,
    access: ProjectAccess,
) -> Result<(), AuthzError> {
    require_project_view(access)?;

    if task.created_by == user_id || access.is_owner() {
        Ok(())
    } else {
        Err(AuthzError::NotTaskOwner)
    }
}
