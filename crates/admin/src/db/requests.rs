//! Request repository.

use serde::Deserialize;
use serde_json::json;

use carelink_core::{Request, RequestId, RequestStatus, VolunteerId};

use super::store::{Collection, Document, DocumentStore, Fields, Query, WriteBatch, fields};
use super::{RepositoryError, Versioned, decode_all, decode_fields};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    assigned_volunteers: Vec<String>,
}

impl TryFrom<Document> for Request {
    type Error = RepositoryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let row: RequestRow = decode_fields(Collection::Requests, &doc)?;
        let status = row
            .status
            .as_deref()
            .map(str::parse::<RequestStatus>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("requests/{}: {e}", doc.id)))?
            .unwrap_or_default();

        Ok(Self {
            id: RequestId::new(doc.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            details: row.details,
            status,
            assigned_volunteers: row
                .assigned_volunteers
                .into_iter()
                .map(VolunteerId::new)
                .collect(),
        })
    }
}

/// Decode a `requests` snapshot, skipping malformed documents.
#[must_use]
pub fn decode_snapshot(docs: Vec<Document>) -> Vec<Request> {
    decode_all(Collection::Requests, docs, Request::try_from)
}

// =============================================================================
// Field Encoding
// =============================================================================

/// Input for a new request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub details: String,
}

impl NewRequest {
    fn to_fields(&self) -> Fields {
        fields(json!({
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "address": self.address,
            "details": self.details,
            "status": RequestStatus::Pending.as_str(),
            "assignedVolunteers": [],
        }))
    }
}

/// Fields written when a volunteer is linked to `request`.
#[must_use]
pub fn assignment_fields(assigned_volunteers: &[VolunteerId]) -> Fields {
    fields(json!({
        "status": RequestStatus::Assigned.as_str(),
        "assignedVolunteers": assigned_volunteers,
    }))
}

/// Fields written by a status change.
#[must_use]
pub fn status_fields(status: RequestStatus) -> Fields {
    fields(json!({ "status": status.as_str() }))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for assistance requests.
pub struct RequestRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RequestRepository<'a> {
    /// Create a new request repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All decodable requests in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store read fails.
    pub async fn list(&self) -> Result<Vec<Request>, RepositoryError> {
        let docs = self.store.fetch(&Query::all(Collection::Requests)).await?;
        Ok(decode_snapshot(docs))
    }

    /// Read one request with its current revision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the document doesn't decode.
    pub async fn get(&self, id: &RequestId) -> Result<Option<Versioned<Request>>, RepositoryError> {
        let Some(doc) = self.store.get(Collection::Requests, id.as_str()).await? else {
            return Ok(None);
        };
        let revision = doc.revision;
        Ok(Some(Versioned {
            record: Request::try_from(doc)?,
            revision,
        }))
    }

    /// Create a pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn create(&self, request: &NewRequest) -> Result<RequestId, RepositoryError> {
        let ids = self
            .store
            .commit(WriteBatch::new().create(Collection::Requests, request.to_fields()))
            .await?;
        ids.into_iter()
            .next()
            .map(RequestId::new)
            .ok_or_else(|| RepositoryError::DataCorruption("store returned no id".to_owned()))
    }

    /// Permanently delete a request. Volunteers keep their back-references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn delete(&self, id: &RequestId) -> Result<(), RepositoryError> {
        self.store
            .commit(WriteBatch::new().delete(Collection::Requests, id.as_str()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn doc(fields_json: serde_json::Value) -> Document {
        Document {
            id: "r1".to_owned(),
            revision: 3,
            fields: fields(fields_json),
        }
    }

    #[test]
    fn test_missing_status_reads_as_pending() {
        let request = Request::try_from(doc(json!({"name": "Ruth"}))).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.assigned_volunteers.is_empty());
    }

    #[test]
    fn test_unknown_status_is_corruption() {
        let result = Request::try_from(doc(json!({"name": "Ruth", "status": "Done"})));
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_snapshot_skips_undecodable_documents() {
        let docs = vec![
            doc(json!({"name": "Ok"})),
            doc(json!({"name": "Bad", "status": "Closed"})),
        ];
        let requests = decode_snapshot(docs);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests.first().unwrap().name, "Ok");
    }

    #[tokio::test]
    async fn test_create_then_get_returns_revision() {
        let store = MemoryStore::new();
        let repo = RequestRepository::new(&store);
        let id = repo
            .create(&NewRequest {
                name: "Walter".to_owned(),
                ..NewRequest::default()
            })
            .await
            .unwrap();

        let fetched = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.revision, 1);
        assert_eq!(fetched.record.name, "Walter");
        assert_eq!(fetched.record.status, RequestStatus::Pending);

        repo.delete(&id).await.unwrap();
        assert!(repo.get(&id).await.unwrap().is_none());
    }
}
