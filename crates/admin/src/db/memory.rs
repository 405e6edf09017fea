//! In-process document store.
//!
//! Used for local development (`STORE_BACKEND=memory`) and tests. Commits
//! are staged against a copy of the data and swapped in only if every write
//! succeeds.

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::RepositoryError;
use super::store::{Collection, Document, DocumentStore, Query, Write, WriteBatch};

/// Capacity of the change-notification channel.
const CHANGE_BUFFER: usize = 256;

type Collections = HashMap<Collection, Vec<Document>>;

/// Document store held entirely in memory.
pub struct MemoryStore {
    data: RwLock<Collections>,
    changes: broadcast::Sender<Collection>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            data: RwLock::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

fn apply(data: &mut Collections, write: Write, created: &mut Vec<String>) -> Result<(), RepositoryError> {
    match write {
        Write::Create { collection, fields } => {
            let id = Uuid::new_v4().to_string();
            data.entry(collection).or_default().push(Document {
                id: id.clone(),
                revision: 1,
                fields,
            });
            created.push(id);
        }
        Write::Update {
            collection,
            id,
            fields,
            expected_revision,
        } => {
            let doc = data
                .get_mut(&collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or(RepositoryError::NotFound)?;
            match expected_revision {
                Some(expected) if doc.revision != expected => {
                    return Err(RepositoryError::Conflict(format!(
                        "{collection}/{id} is at revision {}, expected {expected}",
                        doc.revision
                    )));
                }
                _ => {}
            }
            doc.fields.extend(fields);
            doc.revision += 1;
        }
        Write::Delete { collection, id } => {
            if let Some(docs) = data.get_mut(&collection) {
                docs.retain(|d| d.id != id);
            }
        }
    }
    Ok(())
}

impl DocumentStore for MemoryStore {
    fn fetch<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Document>, RepositoryError>> {
        async move {
            let data = self.data.read().await;
            Ok(data
                .get(&query.collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| query.matches(&d.fields))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
        .boxed()
    }

    fn get<'a>(
        &'a self,
        collection: Collection,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, RepositoryError>> {
        async move {
            let data = self.data.read().await;
            Ok(data
                .get(&collection)
                .and_then(|docs| docs.iter().find(|d| d.id == id))
                .cloned())
        }
        .boxed()
    }

    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, Result<Vec<String>, RepositoryError>> {
        async move {
            let touched = batch.collections();
            let mut data = self.data.write().await;

            let mut staged = data.clone();
            let mut created = Vec::new();
            for write in batch.into_writes() {
                apply(&mut staged, write, &mut created)?;
            }
            *data = staged;
            drop(data);

            for collection in touched {
                // No receivers is fine.
                let _ = self.changes.send(collection);
            }
            Ok(created)
        }
        .boxed()
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}
