//! Feedback statistics endpoint

use axum::{extract::State, Json};

use super::auth::AuthUser;
use crate::error::ApiResult;
use crate::stats::FeedbackStats;
use crate::AppState;

/// GET /feedback/stats (curators)
pub async fn get_stats(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Json<FeedbackStats>> {
    caller.require_curator()?;
    Ok(Json(state.stats.get_stats().await?))
}
