//! REST API client module for the Otto backend.
//!
//! This module provides the `ApiClient` for logging in, looking up the
//! current user, and reading the user's turn data.
//!
//! Authenticated endpoints take a bearer token issued by `/api/auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi};
pub use error::ApiError;
