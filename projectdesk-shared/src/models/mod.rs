//! Database models for ProjectDesk
//!
//! Every model exposes associated async functions generic over
//! `sqlx::PgExecutor`, so the same query runs against the pool or inside an
//! open transaction (`&mut *tx`).
//!
//! # Models
//!
//! - `user`: Accounts and credentials
//! - `project`: Projects with a budget and a date range
//! - `task`: Tasks inside a project, each claiming part of its budget
//! - `time_log`: At most one time entry per task
//! - `team_member`: Project membership and invitations
//! - `comment`: Task discussion threads
//!
//! # Example
//!
//! ```no_run
//! use projectdesk_shared::models::user::{CreateUser, User};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! let user = User::create(&pool, CreateUser {
//!     name: "Ada".to_string(),
//!     email: "ada@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//! })
//! .await?;
//!
//! let again = User::find_by_email(&pool, "ADA@example.com").await?;
//! assert_eq!(again.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

pub mod comment;
pub mod project;
pub mod task;
pub mod team_member;
pub mod time_log;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// a missing key yields `None`, `null` yields `Some(None)` and a value yields
/// `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
