//! Local projections of remote collections.
//!
//! A [`Projection`] owns one subscription task. Every snapshot from the
//! store replaces the local record set wholesale through [`replace`]; the
//! only other path is an optimistic patch after a successful write, which the
//! next snapshot then confirms or overwrites.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{Document, RepositoryError};

/// Records that can be patched in place by key.
pub trait Keyed {
    type Key: PartialEq;

    fn key(&self) -> &Self::Key;
}

impl Keyed for carelink_core::Request {
    type Key = carelink_core::RequestId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

impl Keyed for carelink_core::Volunteer {
    type Key = carelink_core::VolunteerId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// Published state of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionState<T> {
    pub records: Vec<T>,
    /// Bumped on every snapshot and every optimistic patch.
    pub version: u64,
    /// `false` until the first snapshot, and again after the subscription fails.
    pub live: bool,
}

impl<T> Default for ProjectionState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            version: 0,
            live: false,
        }
    }
}

/// Apply a full snapshot.
pub fn replace<T>(state: &mut ProjectionState<T>, snapshot: Vec<T>) {
    state.records = snapshot;
    state.version += 1;
    state.live = true;
}

/// A live, read-mostly copy of a collection.
pub struct Projection<T> {
    state: Arc<watch::Sender<ProjectionState<T>>>,
    task: JoinHandle<()>,
}

impl<T> Projection<T>
where
    T: Keyed + Clone + Send + Sync + 'static,
{
    /// Spawn the subscription task.
    ///
    /// `decode` turns each raw snapshot into records. On the first stream
    /// error the projection is marked not live and the task ends.
    pub fn spawn<S, D>(name: &'static str, snapshots: S, decode: D) -> Self
    where
        S: Stream<Item = Result<Vec<Document>, RepositoryError>> + Send + 'static,
        D: Fn(Vec<Document>) -> Vec<T> + Send + 'static,
    {
        let (tx, _) = watch::channel(ProjectionState::default());
        let state = Arc::new(tx);
        let publisher = Arc::clone(&state);

        let task = tokio::spawn(async move {
            let mut snapshots = Box::pin(snapshots);
            while let Some(next) = snapshots.next().await {
                match next {
                    Ok(docs) => {
                        let records = decode(docs);
                        tracing::debug!(projection = name, count = records.len(), "Snapshot");
                        publisher.send_modify(|s| replace(s, records));
                    }
                    Err(e) => {
                        tracing::error!(projection = name, error = %e, "Subscription failed");
                        publisher.send_modify(|s| s.live = false);
                        return;
                    }
                }
            }
            tracing::debug!(projection = name, "Subscription closed");
        });

        Self { state, task }
    }

    /// Watch for new snapshots and patches.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProjectionState<T>> {
        self.state.subscribe()
    }

    /// Copy of the current records.
    #[must_use]
    pub fn records(&self) -> Vec<T> {
        self.state.borrow().records.clone()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state.borrow().live
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    /// Find a record by key.
    #[must_use]
    pub fn find(&self, key: &T::Key) -> Option<T> {
        self.state
            .borrow()
            .records
            .iter()
            .find(|r| r.key() == key)
            .cloned()
    }

    /// Optimistically replace the record with the same key.
    ///
    /// Records not yet in the projection are left for the next snapshot to
    /// deliver.
    pub fn patch(&self, record: T) {
        self.state.send_if_modified(|s| {
            let Some(slot) = s.records.iter_mut().find(|r| r.key() == record.key()) else {
                return false;
            };
            *slot = record;
            s.version += 1;
            true
        });
    }

    /// Optimistically edit the record with `key` in place.
    pub fn patch_with(&self, key: &T::Key, edit: impl FnOnce(&mut T)) {
        self.state.send_if_modified(|s| {
            let Some(slot) = s.records.iter_mut().find(|r| r.key() == key) else {
                return false;
            };
            edit(slot);
            s.version += 1;
            true
        });
    }

    /// Optimistically drop the record with `key`.
    pub fn remove(&self, key: &T::Key) {
        self.state.send_if_modified(|s| {
            let before = s.records.len();
            s.records.retain(|r| r.key() != key);
            if s.records.len() == before {
                return false;
            }
            s.version += 1;
            true
        });
    }
}

impl<T> Drop for Projection<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
