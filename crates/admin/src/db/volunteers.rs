//! Volunteer repository.

use serde::Deserialize;
use serde_json::json;

use carelink_core::{RequestId, Volunteer, VolunteerId, VolunteerStatus};

use super::store::{Collection, Document, DocumentStore, Fields, Query, WriteBatch, fields};
use super::{RepositoryError, Versioned, decode_all, decode_fields};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolunteerRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    requested_users: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

impl TryFrom<Document> for Volunteer {
    type Error = RepositoryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let row: VolunteerRow = decode_fields(Collection::Volunteers, &doc)?;
        let status = row
            .status
            .as_deref()
            .map(str::parse::<VolunteerStatus>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("volunteers/{}: {e}", doc.id)))?
            .unwrap_or_default();

        Ok(Self {
            id: VolunteerId::new(doc.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            verified: row.verified,
            requested_users: row.requested_users.into_iter().map(RequestId::new).collect(),
            status,
        })
    }
}

/// Decode a `volunteers` snapshot, skipping malformed documents.
#[must_use]
pub fn decode_snapshot(docs: Vec<Document>) -> Vec<Volunteer> {
    decode_all(Collection::Volunteers, docs, Volunteer::try_from)
}

/// Input for a new volunteer registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVolunteer {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    /// Seed data may start pre-approved; real sign-ups never do.
    #[serde(default)]
    pub verified: bool,
}

impl NewVolunteer {
    fn to_fields(&self) -> Fields {
        fields(json!({
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "location": self.location,
            "verified": self.verified,
            "requestedUsers": [],
            "status": VolunteerStatus::Available.as_str(),
        }))
    }
}

/// Fields written when the volunteer picks up a request.
#[must_use]
pub fn assignment_fields(requested_users: &[RequestId]) -> Fields {
    fields(json!({
        "requestedUsers": requested_users,
        "status": VolunteerStatus::Assigned.as_str(),
    }))
}

/// Repository for volunteer registrations.
pub struct VolunteerRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> VolunteerRepository<'a> {
    /// Create a new volunteer repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All decodable volunteers in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store read fails.
    pub async fn list(&self) -> Result<Vec<Volunteer>, RepositoryError> {
        let docs = self.store.fetch(&Query::all(Collection::Volunteers)).await?;
        Ok(decode_snapshot(docs))
    }

    /// Read one volunteer with its current revision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the document doesn't decode.
    pub async fn get(
        &self,
        id: &VolunteerId,
    ) -> Result<Option<Versioned<Volunteer>>, RepositoryError> {
        let Some(doc) = self.store.get(Collection::Volunteers, id.as_str()).await? else {
            return Ok(None);
        };
        let revision = doc.revision;
        Ok(Some(Versioned {
            record: Volunteer::try_from(doc)?,
            revision,
        }))
    }

    /// Register a volunteer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn create(&self, volunteer: &NewVolunteer) -> Result<VolunteerId, RepositoryError> {
        let ids = self
            .store
            .commit(WriteBatch::new().create(Collection::Volunteers, volunteer.to_fields()))
            .await?;
        ids.into_iter()
            .next()
            .map(VolunteerId::new)
            .ok_or_else(|| RepositoryError::DataCorruption("store returned no id".to_owned()))
    }

    /// Mark a volunteer as verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the volunteer doesn't exist.
    pub async fn approve(&self, id: &VolunteerId) -> Result<(), RepositoryError> {
        self.store
            .commit(WriteBatch::new().update(
                Collection::Volunteers,
                id.as_str(),
                fields(json!({ "verified": true })),
            ))
            .await?;
        Ok(())
    }

    /// Delete a volunteer. Requests that reference them are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn remove(&self, id: &VolunteerId) -> Result<(), RepositoryError> {
        self.store
            .commit(WriteBatch::new().delete(Collection::Volunteers, id.as_str()))
            .await?;
        Ok(())
    }
}
