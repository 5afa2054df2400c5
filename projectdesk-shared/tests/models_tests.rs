/// Database-backed model tests
///
/// Skipped when `DATABASE_URL` is unset. Every test creates its own users and
/// projects with unique emails, so the tests can run in parallel.

use chrono::{Duration, Utc};
use projectdesk_shared::{
    budget::BudgetCheck,
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{create_pool, PoolConfig},
    },
    models::{
        project::{CreateProject, Project, ProjectStatus},
        task::{CreateTask, Task, TaskPriority, TaskStatus},
        team_member::{CreateTeamMember, TeamMember, TeamRole},
        time_log::{CreateTimeLog, TimeLog, UNIQUE_TASK_CONSTRAINT},
        user::{CreateUser, User},
    },
};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    // Parallel tests may race to create it; connecting below is the real check.
    if let Err(e) = ensure_database_exists(&url).await {
        eprintln!("ensure_database_exists: {e}");
    }
    let pool = create_pool(PoolConfig {
        url,
        ..Default::default()
    })
    .await
    .expect("pool should connect");
    run_migrations(&pool).await.expect("migrations should apply");
    Some(pool)
}

async fn user(pool: &PgPool, name: &str) -> User {
    User::create(
        pool,
        CreateUser {
            name: name.to_string(),
            email: format!("{}-{}@Example.com", name.to_lowercase(), Uuid::new_v4()),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .expect("user insert")
}

async fn project(pool: &PgPool, owner: &User, budget: i64) -> Project {
    let project = Project::create(
        pool,
        CreateProject {
            name: "Warehouse move".to_string(),
            description: None,
            start_date: None,
            end_date: None,
            status: ProjectStatus::NotStarted,
            budget,
            created_by: owner.id,
        },
    )
    .await
    .expect("project insert");

    TeamMember::create(pool, CreateTeamMember::creator(project.id, owner.id))
        .await
        .expect("creator membership");

    project
}

async fn task(pool: &PgPool, project: &Project, owner: &User, budget: i64) -> Task {
    Task::create(
        pool,
        CreateTask {
            project_id: project.id,
            title: format!("Task {}", budget),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            budget,
            assigned_user_id: None,
            created_by: owner.id,
            due_date: None,
        },
    )
    .await
    .expect("task insert")
}

#[tokio::test]
async fn test_email_lookup_is_case_insensitive() {
    let Some(pool) = pool().await else { return };
    let ada = user(&pool, "Ada").await;

    assert_eq!(ada.email, ada.email.to_lowercase());

    let found = User::find_by_email(&pool, &ada.email.to_uppercase())
        .await
        .unwrap()
        .expect("lookup ignores case");
    assert_eq!(found.id, ada.id);
}

#[tokio::test]
async fn test_allocated_budget_excludes_the_given_task() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Owner").await;
    let project = project(&pool, &owner, 1_000).await;

    let first = task(&pool, &project, &owner, 300).await;
    task(&pool, &project, &owner, 200).await;

    assert_eq!(Task::allocated_budget(&pool, project.id, None).await.unwrap(), 500);
    assert_eq!(
        Task::allocated_budget(&pool, project.id, Some(first.id)).await.unwrap(),
        200
    );

    // The remaining 500 fits exactly; one more unit does not.
    let allocated = Task::allocated_budget(&pool, project.id, None).await.unwrap();
    let budget = Project::lock_budget(&pool, project.id).await.unwrap().unwrap();
    assert!(BudgetCheck::evaluate(budget, allocated, 500).is_ok());
    assert!(BudgetCheck::evaluate(budget, allocated, 501).is_err());
}

#[tokio::test]
async fn test_allocated_budget_of_empty_project_is_zero() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Empty").await;
    let project = project(&pool, &owner, 0).await;

    assert_eq!(Task::allocated_budget(&pool, project.id, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_time_log_violates_unique_constraint() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Timer").await;
    let project = project(&pool, &owner, 100).await;
    let task = task(&pool, &project, &owner, 10).await;

    let log = CreateTimeLog {
        task_id: task.id,
        user_id: owner.id,
        start_time: Utc::now(),
        end_time: None,
        description: None,
    };

    TimeLog::create(&pool, log.clone()).await.expect("first log");
    assert!(TimeLog::exists_for_task(&pool, task.id).await.unwrap());

    let err = TimeLog::create(&pool, log).await.expect_err("second log must fail");
    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
    assert_eq!(db_err.constraint(), Some(UNIQUE_TASK_CONSTRAINT));
}

#[tokio::test]
async fn test_stop_only_affects_running_timers() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Stopper").await;
    let project = project(&pool, &owner, 100).await;
    let task = task(&pool, &project, &owner, 10).await;

    let start = Utc::now() - Duration::minutes(45);
    TimeLog::create(
        &pool,
        CreateTimeLog {
            task_id: task.id,
            user_id: owner.id,
            start_time: start,
            end_time: None,
            description: Some("debugging".to_string()),
        },
    )
    .await
    .unwrap();

    let stopped = TimeLog::stop(&pool, task.id, Utc::now())
        .await
        .unwrap()
        .expect("running timer stops");
    assert!(!stopped.is_running());
    assert!(stopped.has_valid_interval());

    assert!(TimeLog::stop(&pool, task.id, Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_project_delete_cascades_to_tasks_and_logs() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Cascade").await;
    let project = project(&pool, &owner, 100).await;
    let task = task(&pool, &project, &owner, 50).await;
    TimeLog::create(
        &pool,
        CreateTimeLog {
            task_id: task.id,
            user_id: owner.id,
            start_time: Utc::now(),
            end_time: None,
            description: None,
        },
    )
    .await
    .unwrap();

    assert!(Project::delete(&pool, project.id).await.unwrap());

    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
    assert!(TimeLog::find_by_task(&pool, task.id).await.unwrap().is_none());
    assert!(TeamMember::find_membership(&pool, project.id, owner.id)
        .await
        .unwrap()
        .is_none());
    assert!(!Project::delete(&pool, project.id).await.unwrap());
}

#[tokio::test]
async fn test_visibility_follows_accepted_membership() {
    let Some(pool) = pool().await else { return };
    let owner = user(&pool, "Lead").await;
    let guest = user(&pool, "Guest").await;
    let project = project(&pool, &owner, 100).await;
    task(&pool, &project, &owner, 10).await;

    let invite = TeamMember::create(
        &pool,
        CreateTeamMember::invitation(project.id, guest.id, TeamRole::Member, owner.id),
    )
    .await
    .unwrap();

    let pending = TeamMember::list_pending_for_user(&pool, guest.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].project_name, "Warehouse move");

    // Pending invitees see nothing yet.
    assert!(Project::list_visible_to(&pool, guest.id).await.unwrap().is_empty());
    assert!(Task::list_visible_to(&pool, guest.id, None).await.unwrap().is_empty());

    // Only the invitee can accept.
    assert!(TeamMember::accept(&pool, project.id, invite.id, owner.id)
        .await
        .unwrap()
        .is_none());
    let accepted = TeamMember::accept(&pool, project.id, invite.id, guest.id)
        .await
        .unwrap()
        .expect("invitee accepts");
    assert!(accepted.is_accepted());

    let visible = Project::list_visible_to(&pool, guest.id).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(
        Task::list_visible_to(&pool, guest.id, Some(TaskStatus::Pending))
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(Task::list_visible_to(&pool, guest.id, Some(TaskStatus::Completed))
        .await
        .unwrap()
        .is_empty());

    let members = TeamMember::list_by_project(&pool, project.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[0].member.is_creator());
}
