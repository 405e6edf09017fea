//! Document storage for the dashboard.
//!
//! # Collections
//!
//! - `requests` - Assistance requests waiting for or holding volunteers
//! - `volunteers` - Volunteer registrations (verified or awaiting approval)
//! - `messages` - Per-volunteer message threads
//! - `assignments` - Audit log of request/volunteer assignments
//! - `users` - Dashboard accounts
//!
//! # Backends
//!
//! - [`postgres::PgDocumentStore`] - One JSONB `documents` table with
//!   `LISTEN/NOTIFY` change feed. Migrations are stored in
//!   `crates/admin/migrations/` and run via:
//!   ```bash
//!   cargo run -p carelink-cli -- migrate
//!   ```
//! - [`memory::MemoryStore`] - In-process store for development and tests
//!
//! Typed repositories wrap a [`DocumentStore`] and translate between
//! documents and the records in `carelink_core`.

pub mod assignments;
pub mod memory;
pub mod messages;
pub mod postgres;
pub mod requests;
pub mod store;
pub mod subscription;
pub mod users;
pub mod volunteers;

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use assignments::AssignmentRepository;
pub use memory::MemoryStore;
pub use messages::MessageRepository;
pub use postgres::PgDocumentStore;
pub use requests::RequestRepository;
pub use store::{Collection, Document, DocumentStore, Fields, Query, WriteBatch};
pub use users::UserRepository;
pub use volunteers::VolunteerRepository;

/// Embedded admin migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Stale revision or constraint violation (e.g., unique email).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A record together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub record: T,
    pub revision: i64,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Deserialize a document's fields into a row struct.
fn decode_fields<R: DeserializeOwned>(
    collection: Collection,
    doc: &Document,
) -> Result<R, RepositoryError> {
    serde_json::from_value(serde_json::Value::Object(doc.fields.clone()))
        .map_err(|e| RepositoryError::DataCorruption(format!("{collection}/{}: {e}", doc.id)))
}

/// Decode every document, dropping (and logging) the ones that don't parse.
fn decode_all<T>(
    collection: Collection,
    docs: Vec<Document>,
    decode: impl Fn(Document) -> Result<T, RepositoryError>,
) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match decode(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(%collection, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}
