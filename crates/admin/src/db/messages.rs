//! Message board repository.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use carelink_core::{Message, MessageId, VolunteerId};

use super::store::{Collection, Document, DocumentStore, Query, WriteBatch, fields};
use super::{RepositoryError, decode_all, decode_fields};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRow {
    volunteer_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<Document> for Message {
    type Error = RepositoryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let row: MessageRow = decode_fields(Collection::Messages, &doc)?;
        Ok(Self {
            id: MessageId::new(doc.id),
            volunteer_id: VolunteerId::new(row.volunteer_id),
            name: row.name,
            details: row.details,
            sent_at: row.sent_at,
        })
    }
}

/// Query for one volunteer's thread.
#[must_use]
pub fn thread_query(volunteer_id: &VolunteerId) -> Query {
    Query::all(Collection::Messages).where_eq("volunteerId", volunteer_id.as_str())
}

/// Repository for volunteer message threads.
pub struct MessageRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> MessageRepository<'a> {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Messages addressed to or from `volunteer_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the store read fails.
    pub async fn thread(&self, volunteer_id: &VolunteerId) -> Result<Vec<Message>, RepositoryError> {
        let docs = self.store.fetch(&thread_query(volunteer_id)).await?;
        Ok(decode_all(Collection::Messages, docs, Message::try_from))
    }

    /// Append a message to a volunteer's thread.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn send(
        &self,
        volunteer_id: &VolunteerId,
        sender_name: &str,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageId, RepositoryError> {
        let ids = self
            .store
            .commit(WriteBatch::new().create(
                Collection::Messages,
                fields(json!({
                    "volunteerId": volunteer_id,
                    "name": sender_name,
                    "details": body,
                    "sentAt": sent_at,
                })),
            ))
            .await?;
        ids.into_iter()
            .next()
            .map(MessageId::new)
            .ok_or_else(|| RepositoryError::DataCorruption("store returned no id".to_owned()))
    }
}
