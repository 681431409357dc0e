//! HTTP API handlers for hcat-fm

pub mod auth;
pub mod buildinfo;
pub mod feedback;
pub mod health;
pub mod sse;
pub mod stats;

pub use auth::AuthUser;
pub use buildinfo::get_build_info;
pub use feedback::{
    get_feedback, list_artifact_feedback, list_feedback, list_my_feedback, review_feedback,
    submit_feedback,
};
pub use health::health_routes;
pub use sse::event_stream;
pub use stats::get_stats;
