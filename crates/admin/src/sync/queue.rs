//! Request queue: live projection of the `requests` collection.

use std::sync::Arc;

use tokio::sync::watch;

use carelink_core::listing::{self, Page, Pagination, StatusFilter};
use carelink_core::{Request, RequestId};

use super::projection::{Projection, ProjectionState};
use crate::db::subscription::snapshots;
use crate::db::{Collection, DocumentStore, Query, requests};

/// Live set of requests in store insertion order.
pub struct RequestQueue {
    projection: Projection<Request>,
}

impl RequestQueue {
    /// Subscribe to the `requests` collection.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            projection: Projection::spawn(
                "requests",
                snapshots(store, Query::all(Collection::Requests)),
                requests::decode_snapshot,
            ),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProjectionState<Request>> {
        self.projection.subscribe()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Request> {
        self.projection.records()
    }

    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<Request> {
        self.projection.find(id)
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.projection.is_live()
    }

    /// Filtered, searched, and paginated view of the current snapshot.
    pub fn list(
        &self,
        filter: StatusFilter,
        search: &str,
        pagination: &mut Pagination,
        requested_page: Option<usize>,
    ) -> Page<Request> {
        let records = self.projection.records();
        listing::list_requests(&records, filter, search, pagination, requested_page)
    }

    /// Apply a request returned by a successful write.
    pub fn apply(&self, request: Request) {
        self.projection.patch(request);
    }

    /// Drop a deleted request ahead of the next snapshot.
    pub fn forget(&self, id: &RequestId) {
        self.projection.remove(id);
    }
}
