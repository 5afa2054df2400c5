//! `GET /v1/users`: every user as `{id, name}`, for assignee and invite pickers

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use projectdesk_shared::{
    auth::middleware::AuthContext,
    models::user::{User, UserSummary},
};

pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let users = User::list_summaries(&state.db).await?;
    Ok(Json(users))
}
