//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE stream construction for catalog microservices.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::EventBus;

/// Stream every [`crate::events::CatalogEvent`] emitted after the client connects
///
/// The first message is a `ConnectionStatus` event. Slow clients that fall
/// behind the bus capacity skip the missed events and keep streaming.
pub fn create_event_sse_stream(
    event_bus: &EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = event_bus.subscribe();
    info!(
        "New SSE client connected to {} events ({} subscribers)",
        service_name,
        event_bus.subscriber_count()
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            warn!("SSE: failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    debug!("SSE: sending {}", event.event_type());
                    yield Ok(Event::default().event(event.event_type()).data(data));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
