//! Live query subscriptions.
//!
//! A subscription yields the full result set once up front and again after
//! every change to the queried collection. Several changes that arrive while
//! a fetch is in flight collapse into a single re-fetch.

use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::RepositoryError;
use super::store::{Document, DocumentStore, Query};

/// Stream of full snapshots for `query`.
///
/// The stream ends after yielding the first error, or when the store's change
/// channel closes.
pub fn snapshots(
    store: Arc<dyn DocumentStore>,
    query: Query,
) -> impl Stream<Item = Result<Vec<Document>, RepositoryError>> + Send + 'static {
    stream! {
        // Subscribe before the first fetch so no change slips between them.
        let mut changes = store.changes();

        loop {
            match store.fetch(&query).await {
                Ok(documents) => yield Ok(documents),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }

            // Wait for a change that concerns this collection.
            loop {
                match changes.recv().await {
                    Ok(collection) if collection == query.collection => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!(
                            collection = %query.collection,
                            missed,
                            "Subscription lagged; re-fetching"
                        );
                        break;
                    }
                    Err(RecvError::Closed) => return,
                }
            }

            // Anything already queued is covered by the fetch we're about to do.
            loop {
                match changes.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }
    }
}
