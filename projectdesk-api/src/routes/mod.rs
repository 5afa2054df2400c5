//! Route handlers, one module per resource
//!
//! - `health`: Liveness and database check
//! - `auth`: Register, login, refresh, current user
//! - `users`: User picker listing
//! - `projects`: Project CRUD, project tasks and schedule summary
//! - `tasks`: Task CRUD with the budget roll-up and embedded time log
//! - `time_logs`: The single time log of a task
//! - `team_members`: Project team and invitations
//! - `invitations`: The caller's pending invitations
//! - `comments`: Task comments

pub mod auth;
pub mod comments;
pub mod health;
pub mod invitations;
pub mod projects;
pub mod tasks;
pub mod team_members;
pub mod time_logs;
pub mod users;

use chrono::{NaiveDate, Utc};

/// Today's date in UTC, used for status derivation and overdue flags.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
