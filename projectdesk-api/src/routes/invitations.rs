//! `GET /v1/invitations`: the caller's pending project invitations
//!
//! Accepting goes through
//! `POST /v1/projects/:id/team-members/:member_id/accept`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use projectdesk_shared::{
    auth::middleware::AuthContext,
    models::team_member::{PendingInvitation, TeamMember, TeamRole},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    /// Team member id, used to accept
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub role: TeamRole,
    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<PendingInvitation> for InvitationResponse {
    fn from(row: PendingInvitation) -> Self {
        Self {
            id: row.member.id,
            project_id: row.member.project_id,
            project_name: row.project_name,
            role: row.member.role,
            invited_by: row.member.invited_by,
            created_at: row.member.created_at,
        }
    }
}

pub async fn list_invitations(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<InvitationResponse>>> {
    let pending = TeamMember::list_pending_for_user(&state.db, auth.user_id).await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}
