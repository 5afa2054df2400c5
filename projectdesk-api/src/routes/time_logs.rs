//! The time log of a task
//!
//! A task has at most one time log, so the log is addressed through its task:
//!
//! - `GET /v1/tasks/:id/time-log`
//! - `POST /v1/tasks/:id/time-log`: 201; 422 if the task already has one
//! - `PUT /v1/tasks/:id/time-log`
//! - `POST /v1/tasks/:id/time-log/stop`: ends a running timer now
//! - `DELETE /v1/tasks/:id/time-log`: 204
//!
//! `start_time` defaults to now and a missing `end_time` leaves the timer
//! running. The same body may be embedded as `time_log` in task create and
//! update requests.

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
        double_option,
        time_log::{interval_is_valid, CreateTimeLog, TimeLog, UpdateTimeLog},
    },
};
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;

const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Time log body, shared by the nested routes and the embedded `time_log`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeLogRequest {
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn interval_error(prefix: &str) -> ApiError {
    ApiError::field(
        field_path(prefix, "end_time"),
        "The end time must be a date after or equal to the start time.",
    )
}

impl TimeLogRequest {
    fn check_description(&self, prefix: &str) -> ApiResult<()> {
        if let Some(Some(description)) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(ApiError::field(
                    field_path(prefix, "description"),
                    format!(
                        "The description may not be greater than {} characters.",
                        MAX_DESCRIPTION_CHARS
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Builds the insert, defaulting `start_time` to `now`.
    pub(crate) fn into_create(
        self,
        task_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        prefix: &str,
    ) -> ApiResult<CreateTimeLog> {
        self.check_description(prefix)?;

        let start_time = self.start_time.unwrap_or(now);
        let end_time = self.end_time.flatten();
        if !interval_is_valid(start_time, end_time) {
            return Err(interval_error(prefix));
        }

        Ok(CreateTimeLog {
            task_id,
            user_id,
            start_time,
            end_time,
            description: self.description.flatten(),
        })
    }

    pub(crate) fn into_update(self, prefix: &str) -> ApiResult<UpdateTimeLog> {
        self.check_description(prefix)?;

        Ok(UpdateTimeLog {
            start_time: self.start_time,
            end_time: self.end_time,
            description: self.description,
        })
    }
}

/// Creates the task's time log or updates the existing one.
///
/// Runs on the caller's connection so task writes can include it in their
/// transaction.
pub(crate) async fn upsert_for_task(
    conn: &mut PgConnection,
    task_id: Uuid,
    user_id: Uuid,
    req: TimeLogRequest,
    prefix: &str,
) -> ApiResult<TimeLog> {
    match TimeLog::find_by_task(&mut *conn, task_id).await? {
        Some(mut existing) => {
            existing.apply(req.into_update(prefix)?);
            if !existing.has_valid_interval() {
                return Err(interval_error(prefix));
            }
            Ok(existing.save(&mut *conn).await?)
        }
        None => {
            let data = req.into_create(task_id, user_id, Utc::now(), prefix)?;
            Ok(TimeLog::create(&mut *conn, data).await?)
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Time log not found".to_string())
}

pub async fn get_time_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TimeLog>> {
    load_task(&state, task_id, auth.user_id).await?;

    let log = TimeLog::find_by_task(&state.db, task_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(log))
}

/// # Errors
///
/// - `422`: the task already has a time log, or the interval is invalid
/// - `409`: a concurrent request created the log first
pub async fn create_time_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<TimeLogRequest>,
) -> ApiResult<(StatusCode, Json<TimeLog>)> {
    load_task(&state, task_id, auth.user_id).await?;

    if TimeLog::exists_for_task(&state.db, task_id).await? {
        return Err(ApiError::BusinessRule(
            "This task already has a time log".to_string(),
        ));
    }

    let data = req.into_create(task_id, auth.user_id, Utc::now(), "")?;
    let log = TimeLog::create(&state.db, data).await?;

    tracing::info!(task_id = %task_id, time_log_id = %log.id, running = log.is_running(), "Time log created");

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update_time_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<TimeLogRequest>,
) -> ApiResult<Json<TimeLog>> {
    load_task(&state, task_id, auth.user_id).await?;

    let mut log = TimeLog::find_by_task(&state.db, task_id)
        .await?
        .ok_or_else(not_found)?;

    log.apply(req.into_update("")?);
    if !log.has_valid_interval() {
        return Err(interval_error(""));
    }

    Ok(Json(log.save(&state.db).await?))
}

/// # Errors
///
/// - `404`: the task has no time log
/// - `422`: the timer is already stopped
pub async fn stop_time_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TimeLog>> {
    load_task(&state, task_id, auth.user_id).await?;

    if let Some(log) = TimeLog::stop(&state.db, task_id, Utc::now()).await? {
        tracing::info!(task_id = %task_id, minutes = log.duration_minutes(Utc::now()), "Timer stopped");
        return Ok(Json(log));
    }

    if TimeLog::exists_for_task(&state.db, task_id).await? {
        Err(ApiError::BusinessRule(
            "This time log is already stopped".to_string(),
        ))
    } else {
        Err(not_found())
    }
}

pub async fn delete_time_log(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_task(&state, task_id, auth.user_id).await?;

    if !TimeLog::delete_by_task(&state.db, task_id).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
