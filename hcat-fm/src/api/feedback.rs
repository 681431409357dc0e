//! Feedback submission, review and listing endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use hcat_common::events::CatalogEvent;
use hcat_common::models::{
    Feedback, FeedbackStatus, FeedbackType, SuggestedChanges, SuggestedImage,
};
use hcat_common::Error;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::moderation::{ReviewDecision, ReviewOutcome};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::store::FeedbackFilter;
use crate::AppState;

/// POST /feedback body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub artifact_id: String,
    pub feedback_type: String,
    #[serde(default)]
    pub suggested_changes: Option<SuggestedChanges>,
    #[serde(default)]
    pub suggested_images: Option<Vec<SuggestedImage>>,
}

/// PUT /feedback/:id/review body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub status: String,
    #[serde(default)]
    pub review_note: Option<String>,
}

/// Listing filters; every parameter is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: Option<String>,
    pub artifact_id: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: Feedback,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListResponse {
    pub feedback: Vec<Feedback>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
    pub page_size: i64,
}

/// Ids that do not parse cannot name an existing record
fn parse_id(raw: &str, kind: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| Error::NotFound(format!("{} {} not found", kind, raw)).into())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

impl ListQuery {
    fn into_filter(self) -> Result<(FeedbackFilter, i64), ApiError> {
        let filter = FeedbackFilter {
            status: self
                .status
                .as_deref()
                .map(str::parse::<FeedbackStatus>)
                .transpose()?,
            feedback_type: self
                .feedback_type
                .as_deref()
                .map(str::parse::<FeedbackType>)
                .transpose()?,
            artifact_id: self
                .artifact_id
                .as_deref()
                .map(|raw| {
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| Error::validation("artifactId", "not a valid id"))
                })
                .transpose()?,
            user_id: None,
        };
        Ok((filter, self.page.unwrap_or(1)))
    }
}

async fn list_page(
    state: &AppState,
    filter: &FeedbackFilter,
    requested_page: i64,
) -> ApiResult<Json<FeedbackListResponse>> {
    let total = state.feedback.count_feedback(filter).await?;
    let pagination = calculate_pagination(total, requested_page);
    let feedback = state
        .feedback
        .list_feedback(filter, PAGE_SIZE, pagination.offset)
        .await?;

    Ok(Json(FeedbackListResponse {
        feedback,
        total,
        page: pagination.page,
        total_pages: pagination.total_pages,
        page_size: PAGE_SIZE,
    }))
}

/// POST /feedback
///
/// Any authenticated caller may submit; the submitter identity comes from
/// the credential.
pub async fn submit_feedback(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<SubmitFeedbackRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FeedbackResponse>)> {
    let request = body(payload)?;
    let artifact_id = parse_id(&request.artifact_id, "Artifact")?;

    let draft = state
        .validator
        .validate(
            artifact_id,
            &request.feedback_type,
            request.suggested_changes,
            request.suggested_images,
        )
        .await?;

    let feedback = state
        .feedback
        .insert_feedback(&draft, &caller, Utc::now())
        .await?;

    info!(
        feedback_id = %feedback.id,
        artifact_id = %feedback.artifact_id,
        feedback_type = feedback.feedback_type.as_str(),
        user_id = %caller.user_id,
        "Feedback submitted"
    );

    state.event_bus.emit_lossy(CatalogEvent::FeedbackSubmitted {
        feedback_id: feedback.id,
        artifact_id: feedback.artifact_id,
        feedback_type: feedback.feedback_type,
        timestamp: feedback.created_at,
    });

    Ok((StatusCode::CREATED, Json(FeedbackResponse { feedback })))
}

/// PUT /feedback/:id/review
pub async fn review_feedback(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewOutcome>> {
    caller.require_curator()?;
    let request = body(payload)?;
    let feedback_id = parse_id(&id, "Feedback")?;
    let decision: ReviewDecision = request.status.parse()?;

    let outcome = state
        .moderation
        .review(feedback_id, decision, &caller.0, request.review_note)
        .await?;

    state.event_bus.emit_lossy(CatalogEvent::FeedbackReviewed {
        feedback_id: outcome.feedback.id,
        artifact_id: outcome.feedback.artifact_id,
        status: outcome.feedback.status,
        artifact_updated: outcome.updated_artifact.is_some(),
        timestamp: outcome.feedback.reviewed_at.unwrap_or_else(Utc::now),
    });

    Ok(Json(outcome))
}

/// GET /feedback/:id
///
/// Visible to curators and to the submitting user.
pub async fn get_feedback(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<FeedbackResponse>> {
    let feedback_id = parse_id(&id, "Feedback")?;
    let feedback = state
        .feedback
        .get_feedback(feedback_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", feedback_id)))?;

    if !caller.is_curator() && feedback.user_id != caller.user_id {
        return Err(Error::Forbidden("not your feedback".to_string()).into());
    }

    Ok(Json(FeedbackResponse { feedback }))
}

/// GET /feedback (curators)
pub async fn list_feedback(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<FeedbackListResponse>> {
    caller.require_curator()?;
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (filter, page) = query.into_filter()?;

    list_page(&state, &filter, page).await
}

/// GET /feedback/mine
pub async fn list_my_feedback(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<FeedbackListResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (mut filter, page) = query.into_filter()?;
    filter.user_id = Some(caller.user_id);

    list_page(&state, &filter, page).await
}

/// GET /artifacts/:id/feedback (curators)
pub async fn list_artifact_feedback(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<FeedbackListResponse>> {
    caller.require_curator()?;
    let artifact_id = parse_id(&id, "Artifact")?;
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (mut filter, page) = query.into_filter()?;
    filter.artifact_id = Some(artifact_id);

    list_page(&state, &filter, page).await
}
