//! Document store abstraction.
//!
//! All dashboard data lives in schemaless documents grouped into named
//! collections. A store can answer queries, apply an atomic batch of
//! writes, and announce which collections changed so live views can
//! re-fetch.

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::broadcast;

use super::RepositoryError;

/// Field map of a single document.
pub type Fields = serde_json::Map<String, Value>;

/// Named document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Requests,
    Volunteers,
    Messages,
    Assignments,
    Users,
}

impl Collection {
    pub const ALL: [Self; 5] = [
        Self::Requests,
        Self::Volunteers,
        Self::Messages,
        Self::Assignments,
        Self::Users,
    ];

    /// Name used as the collection key in storage and change notifications.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Volunteers => "volunteers",
            Self::Messages => "messages",
            Self::Assignments => "assignments",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Bumped on every update. Used as the compare-and-swap token.
    pub revision: i64,
    pub fields: Fields,
}

/// Top-level field equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// A collection read, optionally narrowed by one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filter: Option<FieldFilter>,
}

impl Query {
    /// Every document in `collection`, in insertion order.
    #[must_use]
    pub const fn all(collection: Collection) -> Self {
        Self {
            collection,
            filter: None,
        }
    }

    /// Narrow to documents whose `field` equals `value`.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(fields))
    }
}

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Insert a new document. The store assigns the id.
    Create { collection: Collection, fields: Fields },
    /// Merge `fields` into an existing document and bump its revision.
    ///
    /// With `expected_revision`, the whole batch fails with
    /// [`RepositoryError::Conflict`] if the document moved on.
    Update {
        collection: Collection,
        id: String,
        fields: Fields,
        expected_revision: Option<i64>,
    },
    /// Remove a document. Deleting a missing document is a no-op.
    Delete { collection: Collection, id: String },
}

impl Write {
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => *collection,
        }
    }
}

/// Writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn create(mut self, collection: Collection, fields: Fields) -> Self {
        self.writes.push(Write::Create { collection, fields });
        self
    }

    #[must_use]
    pub fn update(mut self, collection: Collection, id: impl Into<String>, fields: Fields) -> Self {
        self.writes.push(Write::Update {
            collection,
            id: id.into(),
            fields,
            expected_revision: None,
        });
        self
    }

    /// Update that only applies if the document is still at `revision`.
    #[must_use]
    pub fn update_if(
        mut self,
        collection: Collection,
        id: impl Into<String>,
        fields: Fields,
        revision: i64,
    ) -> Self {
        self.writes.push(Write::Update {
            collection,
            id: id.into(),
            fields,
            expected_revision: Some(revision),
        });
        self
    }

    #[must_use]
    pub fn delete(mut self, collection: Collection, id: impl Into<String>) -> Self {
        self.writes.push(Write::Delete {
            collection,
            id: id.into(),
        });
        self
    }

    #[must_use]
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Distinct collections touched, in first-write order.
    #[must_use]
    pub fn collections(&self) -> Vec<Collection> {
        let mut touched = Vec::new();
        for write in &self.writes {
            let c = write.collection();
            if !touched.contains(&c) {
                touched.push(c);
            }
        }
        touched
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Backend-independent document storage.
///
/// Implementations must apply [`WriteBatch`]es atomically and publish the
/// touched collections on [`DocumentStore::changes`] after every commit.
pub trait DocumentStore: Send + Sync {
    /// Read the documents matching `query` in insertion order.
    fn fetch<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Document>, RepositoryError>>;

    /// Read one document by id.
    fn get<'a>(
        &'a self,
        collection: Collection,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, RepositoryError>>;

    /// Apply every write in `batch` or none of them.
    ///
    /// Returns the ids assigned to `Create` writes, in batch order.
    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, Result<Vec<String>, RepositoryError>>;

    /// Change notifications, one message per touched collection per commit.
    fn changes(&self) -> broadcast::Receiver<Collection>;
}

/// Build a [`Fields`] map from a `json!({...})` object literal.
///
/// Non-object values yield an empty map.
#[must_use]
pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
