//! Assignment audit log.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use carelink_core::{AssignmentId, AssignmentRecord, RequestId, RequestStatus, VolunteerId};

use super::store::{Collection, Document, DocumentStore, Fields, Query, fields};
use super::{RepositoryError, decode_all, decode_fields};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentRow {
    request_id: String,
    volunteer_id: String,
    assigned_at: DateTime<Utc>,
    #[serde(default)]
    assigned_by: String,
    #[serde(default)]
    status: Option<String>,
}

impl TryFrom<Document> for AssignmentRecord {
    type Error = RepositoryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let row: AssignmentRow = decode_fields(Collection::Assignments, &doc)?;
        let status = row
            .status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("assignments/{}: {e}", doc.id)))?
            .unwrap_or(RequestStatus::Assigned);

        Ok(Self {
            id: AssignmentId::new(doc.id),
            request_id: RequestId::new(row.request_id),
            volunteer_id: VolunteerId::new(row.volunteer_id),
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by,
            status,
        })
    }
}

/// Fields for a new audit entry.
#[must_use]
pub fn record_fields(
    request_id: &RequestId,
    volunteer_id: &VolunteerId,
    assigned_by: &str,
    assigned_at: DateTime<Utc>,
) -> Fields {
    fields(json!({
        "requestId": request_id,
        "volunteerId": volunteer_id,
        "assignedAt": assigned_at,
        "assignedBy": assigned_by,
        "status": RequestStatus::Assigned.as_str(),
    }))
}

/// Read access to the assignment audit log. Entries are only ever written
/// as part of an assignment batch.
pub struct AssignmentRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> AssignmentRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Audit entries for one request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store read fails.
    pub async fn for_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<AssignmentRecord>, RepositoryError> {
        let query = Query::all(Collection::Assignments).where_eq("requestId", request_id.as_str());
        let docs = self.store.fetch(&query).await?;
        Ok(decode_all(
            Collection::Assignments,
            docs,
            AssignmentRecord::try_from,
        ))
    }
}
