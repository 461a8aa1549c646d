//! Server-Sent Events for refresh notifications

use axum::response::sse::{Event, KeepAlive, Sse};
use chargeboard_core::{DataEvent, EventBus};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Create an SSE stream from the event bus
///
/// Lagged receivers silently skip the events they missed.
pub fn create_sse_stream(event_bus: &EventBus) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(event_bus.subscribe());

    let sse_stream = stream.filter_map(|result: Result<DataEvent, _>| {
        let event = result.ok()?;
        let data = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().event(event.name()).data(data)))
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
