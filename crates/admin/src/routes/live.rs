//! Live dashboard feed.
//!
//! `GET /api/live/summary` is a server-sent-events stream. It sends the
//! current summary on connect and a fresh one after every projection update.
//! The stream ends when either projection shuts down.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;

use carelink_core::DashboardSummary;

use crate::{middleware::RequireAdminAuth, state::AppState};

/// SSE event name carrying a JSON [`DashboardSummary`].
pub const SUMMARY_EVENT: &str = "summary";

fn summary_event(summary: &DashboardSummary) -> Option<Event> {
    match Event::default().event(SUMMARY_EVENT).json_data(summary) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode summary event");
            None
        }
    }
}

/// Stream summary updates.
///
/// GET /api/live/summary
pub async fn summary_events(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut requests = state.requests().subscribe();
    let mut volunteers = state.volunteers().subscribe();

    let events = stream! {
        let mut last = state.summary();
        if let Some(event) = summary_event(&last) {
            yield Ok(event);
        }

        loop {
            let changed = tokio::select! {
                r = requests.changed() => r,
                v = volunteers.changed() => v,
            };
            if changed.is_err() {
                tracing::debug!("Projection closed; ending summary stream");
                break;
            }

            // Optimistic patches often leave the counts untouched.
            let summary = state.summary();
            if summary == last {
                continue;
            }
            last = summary;
            if let Some(event) = summary_event(&summary) {
                yield Ok(event);
            }
        }
    };

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
