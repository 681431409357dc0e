//! # Heritage Catalog Common Library
//!
//! Shared code for the catalog microservices:
//! - Domain models (artifacts, feedback, identities)
//! - Error taxonomy
//! - Configuration loading and root folder resolution
//! - Database schema and initialization
//! - Bearer-token authentication
//! - Event bus and SSE streaming

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
