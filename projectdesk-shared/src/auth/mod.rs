//! Authentication and authorization
//!
//! - [`password`]: Argon2id hashing and the password strength rule
//! - [`jwt`]: HS256 access and refresh tokens
//! - [`middleware`]: Bearer-token middleware and the `AuthContext` extractor
//! - [`authorization`]: Per-project access checks
//!
//! # Example
//!
//! ```
//! use projectdesk_shared::auth::jwt::{issue_token_pair, validate_access_token};
//! use projectdesk_shared::auth::password::{hash_password, verify_password};
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("launch-day-1")?;
//! assert!(verify_password("launch-day-1", &hash)?);
//!
//! let secret = "a-signing-secret-of-at-least-32-bytes!";
//! let pair = issue_token_pair(Uuid::new_v4(), secret)?;
//! validate_access_token(&pair.access_token, secret)?;
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
