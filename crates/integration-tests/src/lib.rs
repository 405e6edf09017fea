//! Integration tests for CareLink.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p carelink-integration-tests
//! ```
//!
//! Everything runs against the in-memory store, so no database is needed.
//!
//! # Test Categories
//!
//! - `assignment_workflow` - Assign, approve, delete, and concurrent writers
//! - `listing` - Filter, search, and pagination over live projections
//! - `store_batches` - Atomic batches and revision preconditions
//! - `http_routes` - Router, sessions, and auth redirects

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;

use carelink_admin::config::AdminConfig;
use carelink_admin::db::requests::NewRequest;
use carelink_admin::db::volunteers::NewVolunteer;
use carelink_admin::db::{DocumentStore, MemoryStore, RequestRepository, VolunteerRepository};
use carelink_admin::routes;
use carelink_admin::state::AppState;
use carelink_admin::sync::ProjectionState;
use carelink_core::{Request, RequestId, Volunteer, VolunteerId};

/// How long to wait for a projection to catch up before failing.
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Session secret that passes the strength checks.
pub const TEST_SESSION_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Configuration for the memory backend, with `overrides` applied on top.
#[must_use]
pub fn test_config(overrides: &[(&str, &str)]) -> AdminConfig {
    let mut vars: HashMap<String, String> = [
        ("STORE_BACKEND", "memory"),
        ("ADMIN_BASE_URL", "http://localhost:3001"),
        ("ADMIN_SESSION_SECRET", TEST_SESSION_SECRET),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert((*k).to_string(), (*v).to_string());
    }
    AdminConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// A memory store with live projections on top.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestContext {
    /// Must be called inside a Tokio runtime: the projections spawn tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    #[must_use]
    pub fn with_config(config: AdminConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn DocumentStore> = store.clone();
        let state = AppState::new(config, shared, None);
        Self { store, state }
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// The full application router with an in-memory session store.
    #[must_use]
    pub fn app(&self) -> Router {
        routes::app(self.state.clone(), tower_sessions::MemoryStore::default())
    }

    pub async fn add_request(&self, name: &str) -> RequestId {
        RequestRepository::new(self.store())
            .create(&NewRequest {
                name: name.to_string(),
                ..NewRequest::default()
            })
            .await
            .unwrap()
    }

    pub async fn add_volunteer(&self, name: &str, email: &str, verified: bool) -> VolunteerId {
        VolunteerRepository::new(self.store())
            .create(&NewVolunteer {
                name: name.to_string(),
                email: email.to_string(),
                location: "Riverside".to_string(),
                verified,
                ..NewVolunteer::default()
            })
            .await
            .unwrap()
    }

    /// Wait until the request projection satisfies `condition`.
    pub async fn requests_where(&self, condition: impl Fn(&[Request]) -> bool) -> Vec<Request> {
        wait_for(self.state.requests().subscribe(), condition).await
    }

    /// Wait until the volunteer projection satisfies `condition`.
    pub async fn volunteers_where(
        &self,
        condition: impl Fn(&[Volunteer]) -> bool,
    ) -> Vec<Volunteer> {
        wait_for(self.state.volunteers().subscribe(), condition).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for a live projection state whose records satisfy `condition`.
pub async fn wait_for<T: Clone>(
    mut receiver: watch::Receiver<ProjectionState<T>>,
    condition: impl Fn(&[T]) -> bool,
) -> Vec<T> {
    let state = tokio::time::timeout(
        SNAPSHOT_TIMEOUT,
        receiver.wait_for(|s| s.live && condition(&s.records)),
    )
    .await
    .expect("projection did not reach the expected state in time")
    .expect("projection closed");
    state.records.clone()
}
