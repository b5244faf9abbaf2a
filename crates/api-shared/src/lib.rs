//! # API Shared
//!
//! Shared definitions for the Curasphere APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Authentication header parsing
//!
//! Used by `api-rest` and the `curasphere` CLI.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
