//! Data models for the Otto backend.
//!
//! This module contains the request and response types exchanged with
//! the REST API:
//!
//! - `LoginRequest`, `LoginResponse`: credential exchange
//! - `UserProfile`: the signed-in user's record
//! - `DataInfo`, `TurnData`, `Turn`: per-clan data descriptors
//! - `RouteLogging`: result of the admin route-logging toggle

pub mod data;
pub mod user;

pub use data::{DataInfo, RouteLogging, Turn, TurnData, TurnRef};
pub use user::{LoginRequest, LoginResponse, UserProfile};
