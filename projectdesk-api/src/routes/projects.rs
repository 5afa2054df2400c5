//! Project endpoints
//!
//! - `GET /v1/projects`: projects the caller owns or has joined
//! - `POST /v1/projects`: create; the caller becomes owner and creator member
//! - `GET /v1/projects/:id`: project with its tasks
//! - `PUT /v1/projects/:id`: partial update (owner only)
//! - `DELETE /v1/projects/:id`: owner only; tasks and members cascade
//! - `GET /v1/projects/:id/tasks`
//! - `GET /v1/projects/:id/summary`: schedule and budget summary
//!
//! Status is derived from the date range when a request leaves it out.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{tasks::TaskResponse, today},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use projectdesk_shared::{
    auth::{
        authorization::{load_project, require_project_owner, require_project_view},
        middleware::AuthContext,
    },
    budget::ensure_project_budget_covers,
    models::{
        double_option,
        project::{CreateProject, Project, ProjectStatus, UpdateProject},
        task::Task,
        team_member::{CreateTeamMember, TeamMember},
        time_log::TimeLog,
    },
    scheduling::ScheduleSummary,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const DATE_ORDER_MESSAGE: &str = "The end date must be a date after or equal to the start date.";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required and may not exceed 255 characters."))]
    pub name: String,

    pub description: Option<String>,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,

    /// Derived from the dates when omitted
    pub status: Option<ProjectStatus>,

    #[serde(default)]
    #[validate(range(min = 0, message = "The budget must be at least 0."))]
    pub budget: i64,
}

impl CreateProjectRequest {
    fn into_create(self, owner: Uuid, today: NaiveDate) -> ApiResult<CreateProject> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::field("end_date", DATE_ORDER_MESSAGE));
            }
        }

        let status = self
            .status
            .unwrap_or_else(|| ProjectStatus::derive(self.start_date, self.end_date, today));

        Ok(CreateProject {
            name: self.name,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            budget: self.budget,
            created_by: owner,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "The name may not be empty or exceed 255 characters."))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,

    pub status: Option<ProjectStatus>,

    #[validate(range(min = 0, message = "The budget must be at least 0."))]
    pub budget: Option<i64>,
}

impl From<UpdateProjectRequest> for UpdateProject {
    fn from(req: UpdateProjectRequest) -> Self {
        UpdateProject {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            status: req.status,
            budget: req.budget,
        }
    }
}

/// A project with its tasks
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,

    pub tasks: Vec<TaskResponse>,
}

fn project_tasks(tasks: Vec<Task>, today: NaiveDate) -> Vec<TaskResponse> {
    tasks
        .into_iter()
        .map(|task| TaskResponse::new(task, today))
        .collect()
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list_visible_to(&state.db, auth.user_id).await?;
    Ok(Json(projects))
}

/// Creates a project and the owner's `project_creator` membership together.
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;
    let data = req.into_create(auth.user_id, today())?;

    let mut tx = state.db.begin().await?;

    let project = Project::create(&mut *tx, data).await?;
    TeamMember::create(&mut *tx, CreateTeamMember::creator(project.id, auth.user_id)).await?;

    tx.commit().await?;

    tracing::info!(
        project_id = %project.id,
        owner = %auth.user_id,
        status = project.status.as_str(),
        budget = project.budget,
        "Project created"
    );

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_view(access)?;

    let tasks = Task::list_by_project(&state.db, project.id).await?;

    Ok(Json(ProjectDetail {
        project,
        tasks: project_tasks(tasks, today()),
    }))
}

/// Partially updates a project.
///
/// # Errors
///
/// - `403`: caller is not the owner
/// - `422`: invalid fields, `end_date` before `start_date`, or a budget below
///   what the project's tasks already claim
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let (_, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_owner(access)?;

    let changes = UpdateProject::from(req);
    let budget_changes = changes.budget.is_some();

    let mut tx = state.db.begin().await?;

    let mut project = Project::find_for_update(&mut *tx, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    project.apply(changes, today());
    if !project.has_valid_dates() {
        return Err(ApiError::field("end_date", DATE_ORDER_MESSAGE));
    }

    if budget_changes {
        let allocated = Task::allocated_budget(&mut *tx, project.id, None).await?;
        ensure_project_budget_covers(project.budget, allocated)?;
    }

    let project = project.save(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!(project_id = %project.id, "Project updated");

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_owner(access)?;

    if !Project::delete(&state.db, project.id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_view(access)?;

    let tasks = Task::list_by_project(&state.db, project.id).await?;
    Ok(Json(project_tasks(tasks, today())))
}

pub async fn project_summary(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ScheduleSummary>> {
    let (project, access) = load_project(&state.db, project_id, auth.user_id).await?;
    require_project_view(access)?;

    let tasks = Task::list_by_project(&state.db, project.id).await?;
    let logs = TimeLog::list_by_project(&state.db, project.id).await?;

    Ok(Json(ScheduleSummary::build(&project, &tasks, &logs, Utc::now())))
}
