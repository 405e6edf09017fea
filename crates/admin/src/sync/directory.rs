//! Volunteer directory: live projection of the `volunteers` collection.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use carelink_core::{Volunteer, VolunteerId};

use super::projection::{Projection, ProjectionState};
use crate::db::subscription::snapshots;
use crate::db::{Collection, DocumentStore, Query, RepositoryError, VolunteerRepository, volunteers};

/// Live set of volunteers plus the approval and removal actions.
pub struct VolunteerDirectory {
    store: Arc<dyn DocumentStore>,
    projection: Projection<Volunteer>,
}

impl VolunteerDirectory {
    /// Subscribe to the `volunteers` collection.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let projection = Projection::spawn(
            "volunteers",
            snapshots(Arc::clone(&store), Query::all(Collection::Volunteers)),
            volunteers::decode_snapshot,
        );
        Self { store, projection }
    }

    /// Full-snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProjectionState<Volunteer>> {
        self.projection.subscribe()
    }

    /// Every volunteer, in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<Volunteer> {
        self.projection.records()
    }

    #[must_use]
    pub fn get(&self, id: &VolunteerId) -> Option<Volunteer> {
        self.projection.find(id)
    }

    /// Verified volunteers, for assignment pickers.
    #[must_use]
    pub fn eligible(&self) -> Vec<Volunteer> {
        self.all().into_iter().filter(Volunteer::is_eligible).collect()
    }

    /// Registrations awaiting approval.
    #[must_use]
    pub fn pending_approval(&self) -> Vec<Volunteer> {
        self.all().into_iter().filter(|v| !v.verified).collect()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.projection.is_live()
    }

    /// Mark a volunteer verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the volunteer no longer exists.
    #[instrument(skip(self), fields(volunteer_id = %id))]
    pub async fn approve(&self, id: &VolunteerId) -> Result<(), RepositoryError> {
        VolunteerRepository::new(self.store.as_ref()).approve(id).await?;
        self.projection.patch_with(id, |v| v.verified = true);
        tracing::info!("Volunteer approved");
        Ok(())
    }

    /// Delete a volunteer. Requests keep any reference to them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    #[instrument(skip(self), fields(volunteer_id = %id))]
    pub async fn remove(&self, id: &VolunteerId) -> Result<(), RepositoryError> {
        VolunteerRepository::new(self.store.as_ref()).remove(id).await?;
        self.projection.remove(id);
        tracing::info!("Volunteer removed");
        Ok(())
    }

    /// Apply a volunteer returned by a successful write.
    pub fn apply(&self, volunteer: Volunteer) {
        self.projection.patch(volunteer);
    }
}
