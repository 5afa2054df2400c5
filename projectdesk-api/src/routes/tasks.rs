//! Task endpoints
//!
//! - `GET /v1/tasks`: tasks in every project the caller can view, `?status=` filters
//! - `GET /v1/tasks/status/:status`: same, status from the path
//! - `POST /v1/tasks`: create, optionally with an embedded `time_log`
//! - `GET /v1/tasks/:id`: task with `overdue` and its time log
//! - `PUT /v1/tasks/:id`: partial update, optionally upserting the time log
//! - `DELETE /v1/tasks/:id`: task creator or project owner
//!
//! Writes run in one transaction that holds the project row lock while the
//! budget roll-up is checked, so concurrent writes to the same project cannot
//! overshoot its budget together.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        time_logs::{upsert_for_task, TimeLogRequest},
        today,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use projectdesk_shared::{
    auth::{
        authorization::{load_project, require_project_view, require_task_delete, AuthzError, ProjectAccess},
        middleware::AuthContext,
    },
    budget::BudgetCheck,
    models::{
        double_option,
        project::Project,
        task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
        time_log::TimeLog,
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "The title field is required and may not exceed 255 characters."))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default = "default_status")]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    #[validate(range(min = 0, message = "The budget must be at least 0."))]
    pub budget: i64,

    pub assigned_user_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,

    pub time_log: Option<TimeLogRequest>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

/// Absent fields are left alone; `null` clears nullable ones.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    pub project_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "The title may not be empty or exceed 255 characters."))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    #[validate(range(min = 0, message = "The budget must be at least 0."))]
    pub budget: Option<i64>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_user_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,

    pub time_log: Option<TimeLogRequest>,
}

impl UpdateTaskRequest {
    fn split(self) -> (UpdateTask, Option<TimeLogRequest>) {
        let changes = UpdateTask {
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            budget: self.budget,
            assigned_user_id: self.assigned_user_id,
            due_date: self.due_date,
        };
        (changes, self.time_log)
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,

    pub overdue: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_log: Option<TimeLog>,
}

impl TaskResponse {
    pub fn new(task: Task, today: NaiveDate) -> Self {
        Self {
            overdue: task.is_overdue(today),
            task,
            time_log: None,
        }
    }

    pub fn with_time_log(mut self, time_log: Option<TimeLog>) -> Self {
        self.time_log = time_log;
        self
    }
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

fn parse_status(raw: &str) -> ApiResult<TaskStatus> {
    raw.parse::<TaskStatus>().map_err(ApiError::BadRequest)
}

/// Loads a task the user may view, along with the user's access to its project.
pub(crate) async fn load_task(
    state: &AppState,
    task_id: Uuid,
    user_id: Uuid,
) -> ApiResult<(Task, ProjectAccess)> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    let (_, access) = load_project(&state.db, task.project_id, user_id).await?;
    require_project_view(access)?;

    Ok((task, access))
}

/// Resolves the project a task is being written into.
///
/// An unknown project is a field error on `project_id` rather than a 404.
async fn target_project(state: &AppState, project_id: Uuid, user_id: Uuid) -> ApiResult<Project> {
    let (project, access) = match load_project(&state.db, project_id, user_id).await {
        Ok(found) => found,
        Err(AuthzError::ProjectNotFound) => {
            return Err(ApiError::field("project_id", "The selected project id is invalid."));
        }
        Err(e) => return Err(e.into()),
    };
    require_project_view(access)?;
    Ok(project)
}

async fn ensure_assignee_exists(state: &AppState, assignee: Option<Uuid>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if User::find_by_id(&state.db, user_id).await?.is_none() {
            return Err(ApiError::field(
                "assigned_user_id",
                "The selected assigned user id is invalid.",
            ));
        }
    }
    Ok(())
}

/// Locks the project row and checks that `requested` fits its budget.
async fn check_budget(
    conn: &mut PgConnection,
    project_id: Uuid,
    excluding: Option<Uuid>,
    requested: i64,
) -> ApiResult<BudgetCheck> {
    let project_budget = Project::lock_budget(&mut *conn, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    let siblings = Task::allocated_budget(&mut *conn, project_id, excluding).await?;

    Ok(BudgetCheck::evaluate(project_budget, siblings, requested)?)
}

/// Locks the project rows a task update touches, lowest id first.
async fn lock_projects(
    conn: &mut PgConnection,
    source: Uuid,
    target: Option<Uuid>,
) -> ApiResult<()> {
    for project_id in lock_order(source, target) {
        Project::lock_budget(&mut *conn, project_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    }
    Ok(())
}

fn lock_order(source: Uuid, target: Option<Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = std::iter::once(source).chain(target).collect();
    ids.sort();
    ids.dedup();
    ids
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    visible_tasks(&state, auth.user_id, status).await
}

pub async fn list_tasks_by_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let status = parse_status(&status)?;
    visible_tasks(&state, auth.user_id, Some(status)).await
}

async fn visible_tasks(
    state: &AppState,
    user_id: Uuid,
    status: Option<TaskStatus>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let today = today();
    let tasks = Task::list_visible_to(&state.db, user_id, status).await?;

    Ok(Json(
        tasks
            .into_iter()
            .map(|task| TaskResponse::new(task, today))
            .collect(),
    ))
}

/// Creates a task, and its time log when one is embedded.
///
/// # Errors
///
/// - `422`: field errors (including `time_log.*`), or the budget would be exceeded
/// - `403`: caller cannot view the project
///
/// A failing embedded time log rolls the task back too.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let project = target_project(&state, req.project_id, auth.user_id).await?;
    ensure_assignee_exists(&state, req.assigned_user_id).await?;

    let mut tx = state.db.begin().await?;

    let check = check_budget(&mut tx, project.id, None, req.budget).await?;

    let task = Task::create(
        &mut *tx,
        CreateTask {
            project_id: project.id,
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            budget: req.budget,
            assigned_user_id: req.assigned_user_id,
            created_by: auth.user_id,
            due_date: req.due_date,
        },
    )
    .await?;

    let time_log = match req.time_log {
        Some(log) => Some(upsert_for_task(&mut tx, task.id, auth.user_id, log, "time_log").await?),
        None => None,
    };

    tx.commit().await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %project.id,
        budget = task.budget,
        remaining_budget = check.remaining,
        "Task created"
    );

    let response = TaskResponse::new(task, today()).with_time_log(time_log);
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let (task, _) = load_task(&state, task_id, auth.user_id).await?;
    let time_log = TimeLog::find_by_task(&state.db, task.id).await?;

    Ok(Json(TaskResponse::new(task, today()).with_time_log(time_log)))
}

/// Partially updates a task.
///
/// The budget is re-checked against the task's project after the update,
/// leaving the task's own current budget out of the sibling sum. When
/// `project_id` moves the task, the caller must be able to view both projects
/// and the check runs against the new one.
///
/// Access checks run before the transaction opens. Inside it the project rows
/// are locked before the task row, the same order a project delete takes them.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()?;
    if let Some(Some(assignee)) = req.assigned_user_id {
        ensure_assignee_exists(&state, Some(assignee)).await?;
    }

    let (current, _) = load_task(&state, task_id, auth.user_id).await?;
    let source = current.project_id;
    let target = req.project_id.filter(|id| *id != source);
    if let Some(target) = target {
        target_project(&state, target, auth.user_id).await?;
    }

    let (changes, time_log_req) = req.split();

    let mut tx = state.db.begin().await?;

    lock_projects(&mut tx, source, target).await?;

    let mut task = Task::find_for_update(&mut *tx, task_id)
        .await?
        .ok_or_else(task_not_found)?;
    if task.project_id != source {
        return Err(ApiError::Conflict(
            "The task was moved by another request".to_string(),
        ));
    }

    task.apply(changes);
    check_budget(&mut tx, task.project_id, Some(task.id), task.budget).await?;

    let task = task.save(&mut *tx).await?;

    let time_log = match time_log_req {
        Some(log) => Some(upsert_for_task(&mut tx, task.id, auth.user_id, log, "time_log").await?),
        None => TimeLog::find_by_task(&mut *tx, task.id).await?,
    };

    tx.commit().await?;

    tracing::info!(task_id = %task.id, project_id = %task.project_id, "Task updated");

    Ok(Json(TaskResponse::new(task, today()).with_time_log(time_log)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (task, access) = load_task(&state, task_id, auth.user_id).await?;
    require_task_delete(&task, auth.user_id, access)?;

    if !Task::delete(&state.db, task.id).await? {
        return Err(task_not_found());
    }

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
