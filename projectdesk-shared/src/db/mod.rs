//! Database layer for ProjectDesk
//!
//! - `pool`: PostgreSQL connection pool with a startup health check
//! - `migrations`: Embedded schema migrations (`migrations/` at the workspace root)
//!
//! Models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
