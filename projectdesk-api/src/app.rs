//! Application state and router
//!
//! ```text
//! /health                                        public
//! /v1/auth/{register,login,refresh}              public
//! /v1/auth/me                                    bearer
//! /v1/users                                      bearer
//! /v1/projects[/:id[/tasks|/summary]]            bearer
//! /v1/projects/:id/team-members[/:member_id[/accept]]
//! /v1/invitations                                bearer
//! /v1/tasks[/:id] , /v1/tasks/status/:status     bearer
//! /v1/tasks/:id/time-log[/stop]                  bearer
//! /v1/tasks/:id/comments                         bearer
//! ```

use crate::{config::Config, error::ApiError, middleware::security, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use projectdesk_shared::auth::middleware::authenticate;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/v1/auth/register", post(routes::auth::register))
        .route("/v1/auth/login", post(routes::auth::login))
        .route("/v1/auth/refresh", post(routes::auth::refresh));

    let protected = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/users", get(routes::users::list_users))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/projects/:id/tasks", get(routes::projects::list_project_tasks))
        .route("/projects/:id/summary", get(routes::projects::project_summary))
        .route(
            "/projects/:id/team-members",
            get(routes::team_members::list_team_members)
                .post(routes::team_members::invite_team_member),
        )
        .route(
            "/projects/:id/team-members/:member_id",
            put(routes::team_members::update_team_member)
                .delete(routes::team_members::remove_team_member),
        )
        .route(
            "/projects/:id/team-members/:member_id/accept",
            post(routes::team_members::accept_invitation),
        )
        .route("/invitations", get(routes::invitations::list_invitations))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/status/:status", get(routes::tasks::list_tasks_by_status))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/tasks/:id/time-log",
            get(routes::time_logs::get_time_log)
                .post(routes::time_logs::create_time_log)
                .put(routes::time_logs::update_time_log)
                .delete(routes::time_logs::delete_time_log),
        )
        .route("/tasks/:id/time-log/stop", post(routes::time_logs::stop_time_log))
        .route(
            "/tasks/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    Router::new()
        .merge(public)
        .nest("/v1", protected)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::security_headers,
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Validates the bearer token and stores the caller's `AuthContext`.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
