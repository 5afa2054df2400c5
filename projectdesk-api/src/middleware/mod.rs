//! Custom middleware for the API server
//!
//! Bearer authentication lives in `app::jwt_auth_layer`, on top of
//! `projectdesk_shared::auth::middleware`.

pub mod security;
