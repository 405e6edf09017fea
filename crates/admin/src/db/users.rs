//! Dashboard account repository.
//!
//! Accounts live in the `users` collection. Emails are stored lowercase and
//! are unique. The Postgres backend backs that with a partial unique index.
//! The memory backend lives in one process, where [`UserRepository::create`]
//! holds [`CREATE_LOCK`] across its lookup and insert.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use carelink_core::{Email, UserId, UserRole};

use super::store::{Collection, Document, DocumentStore, Query, WriteBatch, fields};
use super::{RepositoryError, decode_fields};
use crate::models::admin_user::{AdminUser, AdminUserWithPassword, default_display_name};

/// Serializes account creation within this process so two registrations of
/// one email cannot both pass the lookup.
static CREATE_LOCK: LazyLock<tokio::sync::Mutex<()>> =
    LazyLock::new(|| tokio::sync::Mutex::new(()));

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRow {
    email: String,
    #[serde(default)]
    name: Option<String>,
    role: String,
    #[serde(default)]
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<Document> for AdminUserWithPassword {
    type Error = RepositoryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let row: UserRow = decode_fields(Collection::Users, &doc)?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in users/{}: {e}", doc.id))
        })?;
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| RepositoryError::DataCorruption(format!("users/{}: {e}", doc.id)))?;
        let name = row
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_display_name(&email));

        Ok(Self {
            user: AdminUser {
                id: UserId::new(doc.id),
                email,
                name,
                role,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for dashboard accounts.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Look up an account and its password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the stored account is invalid.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<AdminUserWithPassword>, RepositoryError> {
        let query = Query::all(Collection::Users).where_eq("email", email.as_str());
        let docs = self.store.fetch(&query).await?;
        docs.into_iter()
            .next()
            .map(AdminUserWithPassword::try_from)
            .transpose()
    }

    /// Look up an account by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the read fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self.get_with_password(email).await?.map(|u| u.user))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(
        &self,
        email: &Email,
        name: Option<&str>,
        role: UserRole,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        let _guard = CREATE_LOCK.lock().await;
        if self.get_with_password(email).await?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "{email} is already registered"
            )));
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| default_display_name(email), ToOwned::to_owned);
        let created_at = Utc::now();

        let ids = self
            .store
            .commit(WriteBatch::new().create(
                Collection::Users,
                fields(json!({
                    "email": email.as_str(),
                    "name": name,
                    "role": role.to_string(),
                    "passwordHash": password_hash,
                    "createdAt": created_at,
                })),
            ))
            .await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::DataCorruption("store returned no id".to_owned()))?;

        Ok(AdminUser {
            id: UserId::new(id),
            email: email.clone(),
            name,
            role,
            created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_keep_email_unique() {
        let store = Arc::new(MemoryStore::new());
        let email = Email::parse("twin@example.org").unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let email = email.clone();
                tokio::spawn(async move {
                    UserRepository::new(store.as_ref())
                        .create(&email, None, UserRole::Admin, "$argon2id$stub")
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, RepositoryError::Conflict(_))),
            }
        }
        assert_eq!(created, 1);

        let users = store.fetch(&Query::all(Collection::Users)).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_email() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store);
        let email = Email::parse("Lead@Example.org").unwrap();

        let created = repo
            .create(&email, None, UserRole::Admin, "$argon2id$stub")
            .await
            .unwrap();
        assert_eq!(created.name, "lead");

        let found = repo.get_with_password(&email).await.unwrap().unwrap();
        assert_eq!(found.user.id, created.id);
        assert_eq!(found.user.role, UserRole::Admin);
        assert_eq!(found.password_hash, "$argon2id$stub");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store);
        let email = Email::parse("lead@example.org").unwrap();

        repo.create(&email, Some("Lead"), UserRole::Admin, "h")
            .await
            .unwrap();
        let again = repo.create(&email, None, UserRole::User, "h").await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));
    }
}
