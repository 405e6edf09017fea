//! Atomic write batches on the in-memory store.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use carelink_admin::db::store::fields;
use carelink_admin::db::{
    Collection, DocumentStore, MemoryStore, RepositoryError, RequestRepository, WriteBatch,
};
use carelink_core::RequestStatus;

#[tokio::test]
async fn test_failed_precondition_applies_nothing() {
    let store = MemoryStore::new();
    let id = RequestRepository::new(&store)
        .create(&carelink_admin::db::requests::NewRequest {
            name: "Ana Ruiz".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let before = store.get(Collection::Requests, id.as_str()).await.unwrap().unwrap();

    let batch = WriteBatch::new()
        .create(Collection::Assignments, fields(json!({"requestId": id.as_str()})))
        .update_if(
            Collection::Requests,
            id.as_str(),
            fields(json!({"status": "Assigned"})),
            before.revision + 1,
        );
    let result = store.commit(batch).await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    let after = store.get(Collection::Requests, id.as_str()).await.unwrap().unwrap();
    assert_eq!(after, before);
    let audit = store
        .fetch(&carelink_admin::db::Query::all(Collection::Assignments))
        .await
        .unwrap();
    assert!(audit.is_empty());
}

#[tokio::test]
async fn test_commit_notifies_each_touched_collection() {
    let store = MemoryStore::new();
    let mut changes = store.changes();

    store
        .commit(
            WriteBatch::new()
                .create(Collection::Requests, fields(json!({"name": "Ana"})))
                .create(Collection::Assignments, fields(json!({}))),
        )
        .await
        .unwrap();

    assert_eq!(changes.recv().await.unwrap(), Collection::Requests);
    assert_eq!(changes.recv().await.unwrap(), Collection::Assignments);
}

#[tokio::test]
async fn test_missing_status_reads_as_pending() {
    let store = MemoryStore::new();
    store
        .commit(WriteBatch::new().create(Collection::Requests, fields(json!({"name": "Ana"}))))
        .await
        .unwrap();

    let requests = RequestRepository::new(&store).list().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests.first().unwrap().status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_unknown_status_is_skipped() {
    let store = MemoryStore::new();
    store
        .commit(
            WriteBatch::new()
                .create(Collection::Requests, fields(json!({"name": "Ana", "status": "Done"})))
                .create(Collection::Requests, fields(json!({"name": "George"}))),
        )
        .await
        .unwrap();

    let requests = RequestRepository::new(&store).list().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests.first().unwrap().name, "George");
}
