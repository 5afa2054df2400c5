//! Project team endpoints
//!
//! - `GET /v1/projects/:id/team-members`: members with `user {id, name, email}`
//! - `POST /v1/projects/:id/team-members`: invite by email (owner only)
//! - `PUT /v1/projects/:id/team-members/:member_id`: change role or status (owner only)
//! - `POST /v1/projects/:id/team-members/:member_id/accept`: the invitee accepts
//! - `DELETE /v1/projects/:id/team-members/:member_id`: owner, or the member leaving
//!
//! The `project_creator` row is fixed: it cannot be removed, demoted or
//! handed to anyone else.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use projectdesk_shared::{
    auth::{
        authorization::{load_project, require_project_owner, AuthzError, ProjectAccess},
        middleware::AuthContext,
    },
    models::{
        team_member::{CreateTeamMember, InvitationStatus, TeamMember, TeamMemberWithUser, TeamRole},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "The email must be a valid email address."))]
    pub email: String,

    #[serde(default = "default_role")]
    pub role: TeamRole,
}

fn default_role() -> TeamRole {
    TeamRole::Member
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: Option<TeamRole>,
    pub status: Option<InvitationStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TeamMemberResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub role: TeamRole,
    pub status: InvitationStatus,
    pub invited_by: Option<Uuid>,
    pub user: MemberUser,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMemberResponse {
    fn new(member: TeamMember, user: MemberUser) -> Self {
        Self {
            id: member.id,
            project_id: member.project_id,
            role: member.role,
            status: member.status,
            invited_by: member.invited_by,
            user,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl From<TeamMemberWithUser> for TeamMemberResponse {
    fn from(row: TeamMemberWithUser) -> Self {
        let user = MemberUser {
            id: row.member.user_id,
            name: row.user_name,
            email: row.user_email,
        };
        TeamMemberResponse::new(row.member, user)
    }
}

impl From<&User> for MemberUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

fn member_not_found() -> ApiError {
    ApiError::NotFound("Team member not found".to_string())
}

fn creator_role_is_reserved() -> ApiError {
    ApiError::field("role", "The project creator role cannot be assigned.")
}

async fn member_user(state: &AppState, user_id: Uuid) -> ApiResult<MemberUser> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(MemberUser::from(&user))
}

/// Applies an owner's role/status change, keeping the creator row fixed.
fn apply_member_update(member: &mut TeamMember, req: UpdateMemberRequest) -> ApiResult<()> {
    if member.is_creator() {
        let changes_role = req.role.is_some_and(|role| role != TeamRole::ProjectCreator);
        let changes_status = req.status.is_some_and(|status| status != InvitationStatus::Accepted);
        if changes_role || changes_status {
            return Err(ApiError::BusinessRule(
                "The project creator's membership cannot be changed".to_string(),
            ));
        }
        return Ok(());
    }

    if let Some(role) = req.role {
        if role == TeamRole::ProjectCreator {
            return Err(creator_role_is_reserved());
        }
        member.role = role;
    }
    if let Some(status) = req.status {
        member.status = status;
    }
    Ok(())
}

pub async fn list_team_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TeamMemberResponse>>> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    if !access.can_view() {
        return Err(AuthzError::NotProjectMember.into());
    }

    let members = TeamMember::list_by_project(&state.db, project.id).await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// Invites a registered user by email.
///
/// # Errors
///
/// - `403`: caller is not the owner
/// - `422`: unknown email, reserved role, or the user is already on the team
pub async fn invite_team_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<TeamMemberResponse>)> {
    req.validate()?;
    if req.role == TeamRole::ProjectCreator {
        return Err(creator_role_is_reserved());
    }

    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_owner(access)?;

    let invitee = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::field("email", "No user is registered with this email address."))?;

    if TeamMember::find_membership(&state.db, project.id, invitee.id)
        .await?
        .is_some()
    {
        return Err(ApiError::BusinessRule(
            "This user is already a member of the project".to_string(),
        ));
    }

    let member = TeamMember::create(
        &state.db,
        CreateTeamMember::invitation(project.id, invitee.id, req.role, auth.user_id),
    )
    .await?;

    tracing::info!(
        project_id = %project.id,
        member_id = %member.id,
        invitee = %invitee.id,
        role = member.role.as_str(),
        "Team member invited"
    );

    Ok((
        StatusCode::CREATED,
        Json(TeamMemberResponse::new(member, MemberUser::from(&invitee))),
    ))
}

pub async fn update_team_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRequest>,
) -> ApiResult<Json<TeamMemberResponse>> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_owner(access)?;

    let mut member = TeamMember::find_in_project(&state.db, project.id, member_id)
        .await?
        .ok_or_else(member_not_found)?;

    apply_member_update(&mut member, req)?;
    let member = member.save(&state.db).await?;
    let user = member_user(&state, member.user_id).await?;

    Ok(Json(TeamMemberResponse::new(member, user)))
}

/// The invited user accepts their own pending invitation.
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TeamMemberResponse>> {
    let member = TeamMember::accept(&state.db, project_id, member_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    tracing::info!(project_id = %project_id, member_id = %member.id, "Invitation accepted");

    let user = member_user(&state, member.user_id).await?;
    Ok(Json(TeamMemberResponse::new(member, user)))
}

/// Removes a member. Members and invitees may remove themselves.
///
/// # Errors
///
/// - `403`: caller is neither the owner nor the member being removed
/// - `422`: the row is the project creator's
pub async fn remove_team_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    if access == ProjectAccess::None {
        return Err(AuthzError::NotProjectMember.into());
    }

    let member = TeamMember::find_in_project(&state.db, project.id, member_id)
        .await?
        .ok_or_else(member_not_found)?;

    if member.user_id != auth.user_id {
        require_project_owner(access)?;
    }

    if member.is_creator() {
        return Err(ApiError::BusinessRule(
            "The project creator cannot be removed".to_string(),
        ));
    }

    if !TeamMember::delete(&state.db, member.id).await? {
        return Err(member_not_found());
    }

    tracing::info!(project_id = %project.id, member_id = %member.id, removed_by = %auth.user_id, "Team member removed");
    Ok(StatusCode::NO_CONTENT)
}
