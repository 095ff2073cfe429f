//! Core library for the Otto client.
//!
//! This crate holds everything that is independent of the terminal UI:
//!
//! - `api`: REST client for the Otto backend with typed errors
//! - `auth`: session state machine and token persistence
//! - `guard`: route guard deciding what the UI may render
//! - `models`: request and response types
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionStatus, SessionStore};
pub use config::Config;
pub use guard::{RouteDecision, RouteGuard};
