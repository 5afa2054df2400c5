//! # ProjectDesk API Server Library
//!
//! HTTP layer of ProjectDesk: projects, tasks with budget roll-up, time logs,
//! teams and comments.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Layered configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
