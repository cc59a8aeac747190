//! # API Shared
//!
//! Shared utilities and definitions for the ICR APIs.
//!
//! Contains:
//! - API-only wire types ([`wire`]): health, errors, login, bulk operations, query strings
//! - Shared services like [`HealthService`]
//! - Shared-password login and signed session tokens ([`auth`])
//!
//! Record types themselves come from `icr-core`; they already carry their serde and OpenAPI
//! derives.

pub mod auth;
pub mod health;
pub mod wire;

pub use auth::{AuthConfig, AuthError, AuthResult, SESSION_COOKIE_NAME, SESSION_TTL_SECS};
pub use health::HealthService;
pub use wire::*;
