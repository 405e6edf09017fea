//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Requires both projections to be live and, for the Postgres backend, the
/// database to answer. Returns 503 Service Unavailable otherwise.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if !state.is_live() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Some(pool) = state.pool() {
        if sqlx::query("SELECT 1").fetch_one(pool).await.is_err() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use axum::{Router, body::Body, http::Request, routing::get};
    use futures::future::BoxFuture;
    use serde_json::json;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminConfig;
    use crate::db::store::fields;
    use crate::db::{
        Collection, Document, DocumentStore, MemoryStore, Query, RepositoryError, WriteBatch,
    };

    /// Memory store whose reads start failing once `broken` is set.
    #[derive(Default)]
    struct BreakableStore {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    impl DocumentStore for BreakableStore {
        fn fetch<'a>(
            &'a self,
            query: &'a Query,
        ) -> BoxFuture<'a, Result<Vec<Document>, RepositoryError>> {
            if self.broken.load(Ordering::SeqCst) {
                return Box::pin(async {
                    Err(RepositoryError::DataCorruption("store unavailable".into()))
                });
            }
            self.inner.fetch(query)
        }

        fn get<'a>(
            &'a self,
            collection: Collection,
            id: &'a str,
        ) -> BoxFuture<'a, Result<Option<Document>, RepositoryError>> {
            self.inner.get(collection, id)
        }

        fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, Result<Vec<String>, RepositoryError>> {
            self.inner.commit(batch)
        }

        fn changes(&self) -> broadcast::Receiver<Collection> {
            self.inner.changes()
        }
    }

    async fn wait_until(state: &AppState, live: bool) {
        for _ in 0..100 {
            if state.is_live() == live {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("projections never reached live == {live}");
    }

    async fn ready_status(state: AppState) -> StatusCode {
        let app = Router::new()
            .route("/health/ready", get(readiness))
            .with_state(state);
        app.oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    fn memory_config() -> AdminConfig {
        AdminConfig::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            "ADMIN_BASE_URL" => Some("http://localhost:3001".to_string()),
            "ADMIN_SESSION_SECRET" => Some("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn memory_state() -> AppState {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        AppState::new(memory_config(), store, None)
    }

    #[tokio::test]
    async fn test_health_answers_without_state() {
        let app = Router::new().route("/health", get(health));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_once_projections_are_live() {
        let state = memory_state();
        wait_until(&state, true).await;
        assert_eq!(ready_status(state).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_after_subscription_fails() {
        let store = Arc::new(BreakableStore::default());
        let state = AppState::new(memory_config(), store.clone(), None);
        wait_until(&state, true).await;

        store.broken.store(true, Ordering::SeqCst);
        store
            .commit(WriteBatch::new().create(Collection::Volunteers, fields(json!({"name": "Jo"}))))
            .await
            .unwrap();
        wait_until(&state, false).await;

        assert_eq!(ready_status(state).await, StatusCode::SERVICE_UNAVAILABLE);
    }
}
