//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! carelink admin create -e admin@example.org -n "Dana Reyes" -p 'correct horse'
//! ```
//!
//! Only accounts with the `admin` role can sign in to the dashboard. The
//! first admin has to come from here; later ones can be created from the
//! dashboard's Accounts page.
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string

use thiserror::Error;

use carelink_admin::db::{self, DocumentStore, PgDocumentStore, RepositoryError};
use carelink_admin::services::{AuthError, AuthService, Registration};
use carelink_core::{UnknownStatus, UserId, UserRole};

use super::{CommandError, database_url};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, user")]
    InvalidRole(String),

    /// Registration refused (bad email, weak password, duplicate).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Store error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for AdminError {
    fn from(e: sqlx::Error) -> Self {
        Self::Command(CommandError::Database(e))
    }
}

/// Parse a role name from the command line.
fn parse_role(role: &str) -> Result<UserRole, AdminError> {
    role.trim()
        .to_lowercase()
        .parse()
        .map_err(|_: UnknownStatus| AdminError::InvalidRole(role.to_owned()))
}

/// Create an account in `store`.
///
/// # Errors
///
/// Returns `AdminError::InvalidRole` for an unknown role and
/// `AdminError::Auth` if registration is refused.
pub async fn create_in(
    store: &dyn DocumentStore,
    email: &str,
    password: &str,
    name: Option<&str>,
    role: &str,
) -> Result<UserId, AdminError> {
    let role = parse_role(role)?;

    let user = AuthService::new(store)
        .register(&Registration {
            email,
            name,
            password,
            confirm_password: password,
            role,
        })
        .await?;

    Ok(user.id)
}

/// Create a new account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns an error if the role is unknown, the database is unreachable, or
/// registration is refused.
pub async fn create_user(
    email: &str,
    password: &str,
    name: Option<&str>,
    role: &str,
) -> Result<UserId, AdminError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    let store = PgDocumentStore::connect(pool).await?;

    tracing::info!("Creating account: {} ({})", email, role);
    let user_id = create_in(&store, email, password, name, role).await?;

    tracing::info!("Account created successfully! ID: {}, Email: {}", user_id, email);
    Ok(user_id)
}
