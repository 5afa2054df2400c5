//! # ProjectDesk Shared Library
//!
//! Types, persistence and business rules shared by the ProjectDesk API server
//! and its integration tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, JWT tokens, request middleware, access checks
//! - `db`: Connection pool and migrations
//! - `budget`: Task budget roll-up against the project budget
//! - `scheduling`: Date-range status derivation and project summaries

pub mod auth;
pub mod budget;
pub mod db;
pub mod models;
pub mod scheduling;

/// Current version of the ProjectDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
