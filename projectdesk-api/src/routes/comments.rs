//! Task comments
//!
//! - `GET /v1/tasks/:id/comments`: oldest first, each with its author
//! - `POST /v1/tasks/:id/comments`: `{ "message": "..." }`, 201
//!
//! Anyone who can view the task's project may read and post.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::tasks::load_task,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use projectdesk_shared::{
    auth::middleware::AuthContext,
    models::{
        comment::{Comment, CommentWithAuthor, CreateComment},
        user::{User, UserSummary},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "The message must be between 1 and 5000 characters."))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub task_id: Uuid,
    pub message: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    fn new(comment: Comment, user: UserSummary) -> Self {
        Self {
            id: comment.id,
            task_id: comment.task_id,
            message: comment.message,
            user,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<CommentWithAuthor> for CommentResponse {
    fn from(row: CommentWithAuthor) -> Self {
        let user = UserSummary {
            id: row.comment.user_id,
            name: row.author_name,
        };
        CommentResponse::new(row.comment, user)
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    load_task(&state, task_id, auth.user_id).await?;

    let comments = Comment::list_by_task(&state.db, task_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    req.validate()?;
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::field(
            "message",
            "The message field is required.",
        ));
    }

    load_task(&state, task_id, auth.user_id).await?;
    let author = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id,
            user_id: auth.user_id,
            message,
        },
    )
    .await?;

    tracing::debug!(task_id = %task_id, comment_id = %comment.id, "Comment posted");

    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment, author.summary()))))
}
