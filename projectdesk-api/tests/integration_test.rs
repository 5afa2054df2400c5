/// End-to-end tests against PostgreSQL
///
/// Every test registers its own users, so the suite runs in parallel against
/// one database. Skipped when `DATABASE_URL` is unset.

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

macro_rules! context {
    () => {
        match TestContext::new().await {
            Some(ctx) => ctx,
            None => return,
        }
    };
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = context!();
    let ada = ctx.register("Ada").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": ada.email.to_uppercase(), "password": "correct-horse-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = ctx.get("/v1/auth/me", &ada).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], ada.id.to_string());
}

#[tokio::test]
async fn test_duplicate_email_and_bad_password() {
    let ctx = context!();
    let ada = ctx.register("Ada").await;

    let (status, _) = ctx
        .send(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "name": "Impostor",
                "email": ada.email,
                "password": "another-pass-2",
                "password_confirmation": "another-pass-2",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": ada.email, "password": "wrong-pass-9" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let ctx = context!();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "name": "Bob",
                "email": "not-an-email",
                "password": "onlyletters",
                "password_confirmation": "different",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password_confirmation"));
}

#[tokio::test]
async fn test_project_creator_joins_the_team() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 1_000).await;

    let (status, body) = ctx
        .get(&format!("/v1/projects/{project_id}/team-members"), &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    let members = body.as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["role"], "project_creator");
    assert_eq!(members[0]["status"], "accepted");
    assert_eq!(members[0]["user"]["id"], owner.id.to_string());

    let (status, body) = ctx.get("/v1/projects", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"] == project_id.as_str()));
}

#[tokio::test]
async fn test_budget_roll_up() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 1_000).await;

    let task = |budget: i64| json!({ "project_id": project_id, "title": "Line item", "budget": budget });

    let (status, first) = ctx.post("/v1/tasks", &owner, task(600)).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");

    // Exact fit.
    let (status, _) = ctx.post("/v1/tasks", &owner, task(400)).await;
    assert_eq!(status, StatusCode::CREATED);

    // One unit over.
    let (status, body) = ctx.post("/v1/tasks", &owner, task(1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "business_rule_violation");
    assert_eq!(ctx.task_count(&project_id).await, 2);

    // An update leaves its own budget out of the sibling sum.
    let first_id = first["id"].as_str().unwrap();
    let (status, _) = ctx
        .put(&format!("/v1/tasks/{first_id}"), &owner, json!({ "budget": 600, "title": "Renamed" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .put(&format!("/v1/tasks/{first_id}"), &owner, json!({ "budget": 601 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The project budget cannot drop below what is allocated.
    let (status, body) = ctx
        .put(&format!("/v1/projects/{project_id}"), &owner, json!({ "budget": 999 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "business_rule_violation");

    let (status, body) = ctx
        .put(&format!("/v1/projects/{project_id}"), &owner, json!({ "budget": 1_500 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["budget"], 1_500);
}

#[tokio::test]
async fn test_moving_a_task_checks_the_target_budget() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let roomy = ctx.create_project(&owner, 1_000).await;
    let tight = ctx.create_project(&owner, 100).await;

    let (_, task) = ctx
        .post("/v1/tasks", &owner, json!({ "project_id": roomy, "title": "Movable", "budget": 500 }))
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, _) = ctx
        .put(&format!("/v1/tasks/{task_id}"), &owner, json!({ "project_id": tight }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx
        .put(
            &format!("/v1/tasks/{task_id}"),
            &owner,
            json!({ "project_id": tight, "budget": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["project_id"], tight.as_str());
    assert_eq!(ctx.task_count(&roomy).await, 0);
}

#[tokio::test]
async fn test_invalid_embedded_time_log_rolls_back_the_task() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 100).await;

    let (status, body) = ctx
        .post(
            "/v1/tasks",
            &owner,
            json!({
                "project_id": project_id,
                "title": "Backwards timer",
                "time_log": {
                    "start_time": "2025-03-01T10:00:00Z",
                    "end_time": "2025-03-01T09:00:00Z",
                },
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "time_log.end_time");
    assert_eq!(ctx.task_count(&project_id).await, 0);
}

#[tokio::test]
async fn test_time_log_lifecycle() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 100).await;

    let (status, task) = ctx
        .post(
            "/v1/tasks",
            &owner,
            json!({
                "project_id": project_id,
                "title": "Timed",
                "time_log": { "start_time": "2025-03-01T09:00:00Z", "description": "kickoff" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    assert!(task["time_log"]["end_time"].is_null());
    let task_id = task["id"].as_str().unwrap();
    let log_uri = format!("/v1/tasks/{task_id}/time-log");

    // One log per task.
    let (status, body) = ctx.post(&log_uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "This task already has a time log");

    let (status, body) = ctx.post(&format!("{log_uri}/stop"), &owner, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["end_time"].is_string());

    let (status, _) = ctx.post(&format!("{log_uri}/stop"), &owner, json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx
        .put(&log_uri, &owner, json!({ "end_time": null, "description": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["end_time"].is_null());
    assert!(body["description"].is_null());

    let (status, _) = ctx.delete(&log_uri, &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.get(&log_uri, &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.post(&log_uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], owner.id.to_string());
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 100).await;

    let (_, task) = ctx
        .post("/v1/tasks", &owner, json!({ "project_id": project_id, "title": "Doomed" }))
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, _) = ctx.delete(&format!("/v1/projects/{project_id}"), &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(ctx.task_count(&project_id).await, 0);
    let (status, _) = ctx.get(&format!("/v1/tasks/{task_id}"), &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.get(&format!("/v1/projects/{project_id}"), &owner).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outsiders_are_forbidden() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let outsider = ctx.register("Outsider").await;
    let project_id = ctx.create_project(&owner, 100).await;

    let (_, task) = ctx
        .post("/v1/tasks", &owner, json!({ "project_id": project_id, "title": "Private" }))
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, body) = ctx.get(&format!("/v1/projects/{project_id}"), &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = ctx.get(&format!("/v1/tasks/{task_id}"), &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post("/v1/tasks", &outsider, json!({ "project_id": project_id, "title": "Intrusion" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&format!("/v1/projects/{project_id}"), &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = ctx.get("/v1/tasks", &outsider).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invitation_flow() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let guest = ctx.register("Guest").await;
    let project_id = ctx.create_project(&owner, 100).await;
    let team_uri = format!("/v1/projects/{project_id}/team-members");

    let (status, body) = ctx
        .post(&team_uri, &owner, json!({ "email": "nobody-here@example.com" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, invite) = ctx.post(&team_uri, &owner, json!({ "email": guest.email })).await;
    assert_eq!(status, StatusCode::CREATED, "{invite}");
    assert_eq!(invite["status"], "pending");
    let member_id = invite["id"].as_str().unwrap();

    let (status, _) = ctx.post(&team_uri, &owner, json!({ "email": guest.email })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Pending invitees cannot see the project yet.
    let (status, _) = ctx.get(&format!("/v1/projects/{project_id}"), &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, pending) = ctx.get("/v1/invitations", &guest).await;
    assert_eq!(pending[0]["id"], member_id);
    assert_eq!(pending[0]["project_name"], "Office fit-out");

    // Only the invitee can accept.
    let accept_uri = format!("{team_uri}/{member_id}/accept");
    let (status, _) = ctx.post(&accept_uri, &owner, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = ctx.post(&accept_uri, &guest, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, _) = ctx.get(&format!("/v1/projects/{project_id}"), &guest).await;
    assert_eq!(status, StatusCode::OK);

    // Members may add tasks but not edit the project.
    let (status, _) = ctx
        .post("/v1/tasks", &guest, json!({ "project_id": project_id, "title": "Guest task" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = ctx
        .put(&format!("/v1/projects/{project_id}"), &guest, json!({ "name": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The creator row is fixed.
    let (_, members) = ctx.get(&team_uri, &owner).await;
    let creator_id = members[0]["id"].as_str().unwrap();
    let (status, body) = ctx.delete(&format!("{team_uri}/{creator_id}"), &owner).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The project creator cannot be removed");

    // Members can leave on their own.
    let (status, _) = ctx.delete(&format!("{team_uri}/{member_id}"), &guest).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.get(&format!("/v1/projects/{project_id}"), &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_task_listing_and_status_filter() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 100).await;

    for (title, status) in [("Open", "pending"), ("Busy", "in_progress"), ("Done", "completed")] {
        let (code, _) = ctx
            .post(
                "/v1/tasks",
                &owner,
                json!({ "project_id": project_id, "title": title, "status": status }),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, body) = ctx.get("/v1/tasks/status/completed", &owner).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Done"]);

    let (_, body) = ctx.get("/v1/tasks?status=in_progress", &owner).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = ctx.get("/v1/tasks/status/finished", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = ctx.get(&format!("/v1/projects/{project_id}/summary"), &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_tasks"], 3);
    assert_eq!(summary["tasks_by_status"]["completed"], 1);
}

#[tokio::test]
async fn test_comments_and_task_delete_permissions() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let guest = ctx.register("Guest").await;
    let project_id = ctx.create_project(&owner, 100).await;
    let team_uri = format!("/v1/projects/{project_id}/team-members");

    let (_, invite) = ctx.post(&team_uri, &owner, json!({ "email": guest.email })).await;
    let member_id = invite["id"].as_str().unwrap();
    ctx.post(&format!("{team_uri}/{member_id}/accept"), &guest, json!({}))
        .await;

    let (_, task) = ctx
        .post("/v1/tasks", &owner, json!({ "project_id": project_id, "title": "Discuss" }))
        .await;
    let task_id = task["id"].as_str().unwrap();
    let comments_uri = format!("/v1/tasks/{task_id}/comments");

    let (status, _) = ctx.post(&comments_uri, &owner, json!({ "message": "First" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = ctx.post(&comments_uri, &guest, json!({ "message": "Second" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["name"], "Guest");

    let (status, _) = ctx.post(&comments_uri, &guest, json!({ "message": "" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, comments) = ctx.get(&comments_uri, &guest).await;
    let messages: Vec<&str> = comments
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["message"].as_str())
        .collect();
    assert_eq!(messages, vec!["First", "Second"]);

    // The guest neither created the task nor owns the project.
    let (status, _) = ctx.delete(&format!("/v1/tasks/{task_id}"), &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx.delete(&format!("/v1/tasks/{task_id}"), &owner).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_stay_within_budget() {
    let ctx = Arc::new(context!());
    let owner = Arc::new(ctx.register("Owner").await);
    let project_id = ctx.create_project(&owner, 1000).await;

    let mut writes = JoinSet::new();
    for i in 0..10 {
        let (ctx, owner, project_id) = (ctx.clone(), owner.clone(), project_id.clone());
        writes.spawn(async move {
            let (status, _) = ctx
                .post(
                    "/v1/tasks",
                    &owner,
                    json!({ "project_id": project_id, "title": format!("Crew {i}"), "budget": 200 }),
                )
                .await;
            status
        });
    }

    let mut created = 0;
    while let Some(status) = writes.join_next().await {
        match status.expect("write task should not panic") {
            StatusCode::CREATED => created += 1,
            StatusCode::UNPROCESSABLE_ENTITY => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 5);

    let allocated: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(budget), 0)::BIGINT FROM tasks WHERE project_id = $1",
    )
    .bind(project_id.parse::<Uuid>().unwrap())
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(allocated, 1000);
}

#[tokio::test]
async fn test_update_task_on_a_single_connection_pool() {
    let ctx = match TestContext::with_max_connections(1).await {
        Some(ctx) => ctx,
        None => return,
    };
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 500).await;
    let other_project = ctx.create_project(&owner, 500).await;

    let (status, task) = ctx
        .post(
            "/v1/tasks",
            &owner,
            json!({ "project_id": project_id, "title": "Order tiles", "budget": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    let task_uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx
        .put(&task_uri, &owner, json!({ "title": "Order floor tiles", "budget": 150 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["title"], "Order floor tiles");

    let (status, body) = ctx
        .put(&task_uri, &owner, json!({ "project_id": other_project }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["project_id"], other_project);
}

#[tokio::test]
async fn test_update_task_rewrites_existing_time_log() {
    let ctx = context!();
    let owner = ctx.register("Owner").await;
    let project_id = ctx.create_project(&owner, 100).await;

    let (status, task) = ctx
        .post(
            "/v1/tasks",
            &owner,
            json!({
                "project_id": project_id,
                "title": "Paint walls",
                "time_log": { "start_time": "2025-03-01T09:00:00Z" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    let log_id = task["time_log"]["id"].clone();
    let task_uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx
        .put(
            &task_uri,
            &owner,
            json!({
                "time_log": { "end_time": "2025-03-01T12:00:00Z", "description": "first coat" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["time_log"]["id"], log_id);
    assert_eq!(body["time_log"]["description"], "first coat");
    assert!(body["time_log"]["end_time"].is_string());

    // An end before the start fails the whole update.
    let (status, body) = ctx
        .put(
            &task_uri,
            &owner,
            json!({
                "title": "Paint ceilings",
                "time_log": { "end_time": "2025-03-01T08:00:00Z" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "time_log.end_time");

    let (status, body) = ctx.get(&task_uri, &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Paint walls");
    assert_eq!(body["time_log"]["description"], "first coat");
    assert_eq!(body["time_log"]["end_time"], json!("2025-03-01T12:00:00Z"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_task_update_racing_project_delete() {
    let ctx = Arc::new(context!());
    let owner = Arc::new(ctx.register("Owner").await);

    for round in 0..5 {
        let project_id = ctx.create_project(&owner, 1000).await;
        let (status, task) = ctx
            .post(
                "/v1/tasks",
                &owner,
                json!({ "project_id": project_id, "title": format!("Round {round}") }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{task}");
        let task_uri = format!("/v1/tasks/{}", task["id"].as_str().unwrap());

        let update = {
            let (ctx, owner) = (ctx.clone(), owner.clone());
            tokio::spawn(async move { ctx.put(&task_uri, &owner, json!({ "budget": 10 })).await })
        };
        let delete = {
            let (ctx, owner) = (ctx.clone(), owner.clone());
            tokio::spawn(async move {
                ctx.delete(&format!("/v1/projects/{project_id}"), &owner).await
            })
        };

        let (update_status, update_body) = update.await.unwrap();
        let (delete_status, _) = delete.await.unwrap();

        assert_eq!(delete_status, StatusCode::NO_CONTENT);
        assert!(
            matches!(update_status, StatusCode::OK | StatusCode::NOT_FOUND),
            "round {round}: {update_status} {update_body}"
        );
    }
}

#[tokio::test]
async fn test_user_listing_exposes_only_id_and_name() {
    let ctx = context!();
    let ada = ctx.register("Ada").await;

    let (status, body) = ctx.get("/v1/users", &ada).await;
    assert_eq!(status, StatusCode::OK);

    let users = body.as_array().expect("array of users");
    let entry = users
        .iter()
        .find(|user| user["id"] == ada.id.to_string())
        .expect("registered user is listed");

    let mut keys: Vec<&str> = entry
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort();
    assert_eq!(keys, ["id", "name"]);
    assert!(users.iter().all(|user| user.get("email").is_none()));
    assert!(users.iter().all(|user| user.get("password_hash").is_none()));
}
