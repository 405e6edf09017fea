//! Request status changes and deletion.

use thiserror::Error;
use tracing::{info, instrument};

use carelink_core::{Request, RequestId, RequestStatus, TransitionError};

use crate::db::{Collection, DocumentStore, RepositoryError, RequestRepository, WriteBatch, requests};

/// Reasons a status change is refused.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("request not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Move a request to `status`, checking it against the assignment state.
///
/// The write is guarded by the revision that was validated, so a concurrent
/// assignment turns into [`RepositoryError::Conflict`] instead of a status
/// that no longer matches `assignedVolunteers`.
///
/// # Errors
///
/// Returns `StatusError::Transition` if the change breaks a status rule.
#[instrument(skip(store), fields(request_id = %id, status = %status))]
pub async fn update_status(
    store: &dyn DocumentStore,
    id: &RequestId,
    status: RequestStatus,
) -> Result<Request, StatusError> {
    let current = RequestRepository::new(store)
        .get(id)
        .await?
        .ok_or(StatusError::NotFound)?;
    current.record.check_transition(status)?;

    if current.record.status == status {
        return Ok(current.record);
    }

    store
        .commit(WriteBatch::new().update_if(
            Collection::Requests,
            id.as_str(),
            requests::status_fields(status),
            current.revision,
        ))
        .await?;

    info!(from = %current.record.status, "Request status changed");
    Ok(Request {
        status,
        ..current.record
    })
}

/// Permanently delete a request.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
#[instrument(skip(store), fields(request_id = %id))]
pub async fn delete(store: &dyn DocumentStore, id: &RequestId) -> Result<(), RepositoryError> {
    RequestRepository::new(store).delete(id).await?;
    info!("Request deleted");
    Ok(())
}
