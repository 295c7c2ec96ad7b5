use crate::state::AppState;
use agora::events::CacheEvent;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventFilter {
    /// CSV of event kinds, e.g. `?type=stored,invalidated`
    #[serde(rename = "type")]
    kinds: Option<String>,
}

impl EventFilter {
    fn allows(&self, event: &CacheEvent) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.split(',').map(str::trim).any(|k| k == event.kind()),
            None => true,
        }
    }
}

/// SSE endpoint that streams cache events to clients
pub async fn stream_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("New SSE client connected. Filter: type={:?}", filter.kinds);

    let stream = BroadcastStream::new(state.event_channel.subscribe());

    let filtered_stream = stream.filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) if filter.allows(&event) => Some(Ok(to_sse_event(&event))),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(n)) => Some(Ok(Event::default()
                    .event("error")
                    .data(format!("Lagged by {} events", n)))),
            }
        }
    });

    Sse::new(filtered_stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &CacheEvent) -> Event {
    let name = format!("cache.{}", event.kind());
    match serde_json::to_string(event) {
        Ok(data) => Event::default()
            .event(name)
            .id(event.timestamp().to_string())
            .data(data),
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}
