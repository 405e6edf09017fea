//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use carelink_core::DashboardSummary;

use crate::config::AdminConfig;
use crate::db::DocumentStore;
use crate::services::AssignmentService;
use crate::sync::{RequestQueue, VolunteerDirectory};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It owns the live projections,
/// so dropping the last clone tears down their subscriptions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Arc<dyn DocumentStore>,
    requests: RequestQueue,
    volunteers: VolunteerDirectory,
    assignments: AssignmentService,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create the application state and start both projections.
    ///
    /// Must be called from inside a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Admin configuration
    /// * `store` - Document store backend
    /// * `pool` - `PostgreSQL` pool when the store is Postgres-backed
    #[must_use]
    pub fn new(config: AdminConfig, store: Arc<dyn DocumentStore>, pool: Option<PgPool>) -> Self {
        let requests = RequestQueue::new(Arc::clone(&store));
        let volunteers = VolunteerDirectory::new(Arc::clone(&store));
        let assignments = AssignmentService::new(Arc::clone(&store), config.assignment);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                requests,
                volunteers,
                assignments,
                pool,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Live request queue.
    #[must_use]
    pub fn requests(&self) -> &RequestQueue {
        &self.inner.requests
    }

    /// Live volunteer directory.
    #[must_use]
    pub fn volunteers(&self) -> &VolunteerDirectory {
        &self.inner.volunteers
    }

    #[must_use]
    pub fn assignments(&self) -> &AssignmentService {
        &self.inner.assignments
    }

    /// Get the database pool, if the store is Postgres-backed.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Whether both projections have a snapshot and a running subscription.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.requests.is_live() && self.inner.volunteers.is_live()
    }

    /// Dashboard counts from the current projections.
    #[must_use]
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::tally(&self.inner.requests.all(), &self.inner.volunteers.all())
    }
}
