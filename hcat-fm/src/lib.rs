//! hcat-fm library - Feedback Moderation module
//!
//! Contributors submit proposed corrections to catalog artifacts; curators
//! approve or reject each one exactly once. Approval merges the proposal
//! into the artifact in the same transaction that records the decision.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use hcat_common::auth::{AuthProvider, TokenAuthProvider};
use hcat_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod merge;
pub mod moderation;
pub mod pagination;
pub mod stats;
pub mod store;
pub mod validator;

use moderation::ModerationEngine;
use stats::StatsAggregator;
use store::{ArtifactStore, FeedbackStore, SqliteStore};
use validator::SubmissionValidator;

/// Module name used in health responses, logs and config lookup
pub const MODULE_NAME: &str = "hcat-fm";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5810;

/// Request body limit
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub feedback: Arc<dyn FeedbackStore>,
    pub validator: Arc<SubmissionValidator>,
    pub moderation: Arc<ModerationEngine>,
    pub stats: Arc<StatsAggregator>,
    pub auth: Arc<dyn AuthProvider>,
    pub event_bus: EventBus,
}

impl AppState {
    /// SQLite-backed state with token authentication
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        Self::with_components(
            store.clone(),
            store,
            Arc::new(TokenAuthProvider::new(db)),
            event_bus,
        )
    }

    /// Wire the components over arbitrary store and auth implementations
    pub fn with_components(
        artifacts: Arc<dyn ArtifactStore>,
        feedback: Arc<dyn FeedbackStore>,
        auth: Arc<dyn AuthProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            validator: Arc::new(SubmissionValidator::new(artifacts.clone())),
            moderation: Arc::new(ModerationEngine::new(feedback.clone(), artifacts)),
            stats: Arc::new(StatsAggregator::new(feedback.clone())),
            feedback,
            auth,
            event_bus,
        }
    }
}

/// Build application router
///
/// `/health`, `/buildinfo` and `/events` are public; every other route
/// authenticates through the [`api::AuthUser`] extractor.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let feedback = Router::new()
        .route("/feedback", post(api::submit_feedback).get(api::list_feedback))
        .route("/feedback/stats", get(api::get_stats))
        .route("/feedback/mine", get(api::list_my_feedback))
        .route("/feedback/:id", get(api::get_feedback))
        .route("/feedback/:id/review", put(api::review_feedback))
        .route("/artifacts/:id/feedback", get(api::list_artifact_feedback));

    let public = Router::new()
        .route("/buildinfo", get(api::get_build_info))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes());

    Router::new()
        .merge(feedback)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
