//! Server-Sent Events for moderation activity

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams `FeedbackSubmitted` and `FeedbackReviewed`. Browsers' EventSource
/// cannot send an Authorization header, so events carry ids and statuses
/// only.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    hcat_common::sse::create_event_sse_stream(&state.event_bus, crate::MODULE_NAME)
}
