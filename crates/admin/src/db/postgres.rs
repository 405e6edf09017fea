//! `PostgreSQL`-backed document store.
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, id)` with a JSONB `fields` column. A row trigger calls
//! `pg_notify('document_changes', collection)` on every insert, update, and
//! delete. [`PgDocumentStore::connect`] starts a listener task that forwards
//! those notifications to local subscribers.

use futures::FutureExt;
use futures::future::BoxFuture;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::instrument;
use uuid::Uuid;

use super::RepositoryError;
use super::store::{Collection, Document, DocumentStore, Fields, Query, Write, WriteBatch};

/// Notification channel written by the `documents` trigger.
pub const CHANGE_CHANNEL: &str = "document_changes";

const CHANGE_BUFFER: usize = 256;

/// Postgres error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    revision: i64,
    fields: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            revision: row.revision,
            fields: row.fields.0,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Document store over a `PostgreSQL` pool.
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<Collection>,
    listener: JoinHandle<()>,
}

impl PgDocumentStore {
    /// Start listening for change notifications and return the store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the listener connection cannot
    /// be established.
    pub async fn connect(pool: PgPool) -> Result<Self, RepositoryError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let listener = tokio::spawn(forward_notifications(listener, changes.clone()));

        Ok(Self {
            pool,
            changes,
            listener,
        })
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Drop for PgDocumentStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl std::fmt::Debug for PgDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDocumentStore").finish_non_exhaustive()
    }
}

/// Relay `NOTIFY` payloads to the broadcast channel.
///
/// `PgListener::recv` reconnects on its own after a dropped connection, so
/// errors are logged and the loop carries on.
async fn forward_notifications(mut listener: PgListener, changes: broadcast::Sender<Collection>) {
    loop {
        match listener.recv().await {
            Ok(notification) => match notification.payload().parse::<Collection>() {
                Ok(collection) => {
                    let _ = changes.send(collection);
                }
                Err(e) => tracing::warn!(payload = notification.payload(), "{e}"),
            },
            Err(e) => {
                tracing::error!(error = %e, "Change listener failed; retrying");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepositoryError::Conflict(db.message().to_owned())
        }
        _ => RepositoryError::Database(e),
    }
}

async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    write: Write,
    created: &mut Vec<String>,
) -> Result<(), RepositoryError> {
    match write {
        Write::Create { collection, fields } => {
            let id = Uuid::new_v4().to_string();
            sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
                .bind(collection.name())
                .bind(&id)
                .bind(Json(fields))
                .execute(&mut **tx)
                .await
                .map_err(map_write_error)?;
            created.push(id);
        }
        Write::Update {
            collection,
            id,
            fields,
            expected_revision,
        } => {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT revision FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(collection.name())
            .bind(&id)
            .fetch_optional(&mut **tx)
            .await?;

            let current = current.ok_or(RepositoryError::NotFound)?;
            match expected_revision {
                Some(expected) if current != expected => {
                    return Err(RepositoryError::Conflict(format!(
                        "{collection}/{id} is at revision {current}, expected {expected}"
                    )));
                }
                _ => {}
            }

            sqlx::query(
                r"
                UPDATE documents
                SET fields = fields || $3, revision = revision + 1, updated_at = NOW()
                WHERE collection = $1 AND id = $2
                ",
            )
            .bind(collection.name())
            .bind(&id)
            .bind(Json(fields))
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;
        }
        Write::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.name())
                .bind(&id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

impl DocumentStore for PgDocumentStore {
    fn fetch<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, Result<Vec<Document>, RepositoryError>> {
        async move {
            let filter = query.filter.as_ref().map(|f| {
                let mut containment = Fields::new();
                containment.insert(f.field.clone(), f.value.clone());
                Json(containment)
            });

            let rows = sqlx::query_as::<_, DocumentRow>(
                r"
                SELECT id, revision, fields
                FROM documents
                WHERE collection = $1 AND ($2::jsonb IS NULL OR fields @> $2)
                ORDER BY seq
                ",
            )
            .bind(query.collection.name())
            .bind(filter)
            .fetch_all(&self.pool)
            .await?;

            Ok(rows.into_iter().map(Document::from).collect())
        }
        .boxed()
    }

    fn get<'a>(
        &'a self,
        collection: Collection,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>, RepositoryError>> {
        async move {
            let row = sqlx::query_as::<_, DocumentRow>(
                "SELECT id, revision, fields FROM documents WHERE collection = $1 AND id = $2",
            )
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(Document::from))
        }
        .boxed()
    }

    #[instrument(skip(self, batch), fields(writes = batch.writes().len()))]
    fn commit(&self, batch: WriteBatch) -> BoxFuture<'_, Result<Vec<String>, RepositoryError>> {
        async move {
            let mut tx = self.pool.begin().await?;
            let mut created = Vec::new();
            for write in batch.into_writes() {
                apply(&mut tx, write, &mut created).await?;
            }
            tx.commit().await?;
            Ok(created)
        }
        .boxed()
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}
