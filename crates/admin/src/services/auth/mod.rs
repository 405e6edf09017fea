//! Admin authentication service.
//!
//! Email and password sign-in for dashboard accounts. Passwords are hashed
//! with Argon2id; only accounts with the `admin` role get a session.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use carelink_core::{Email, UserRole};

use crate::db::{DocumentStore, RepositoryError, UserRepository};
use crate::models::admin_user::AdminUser;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct Registration<'r> {
    pub email: &'r str,
    pub name: Option<&'r str>,
    pub password: &'r str,
    pub confirm_password: &'r str,
    pub role: UserRole,
}

/// Admin authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            users: UserRepository::new(store),
        }
    }

    /// Verify an email and password and require the `admin` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::NotAdmin` if the password is right but the role isn't.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let account = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &account.password_hash)?;

        if !account.user.role.is_admin() {
            tracing::warn!(email = %email, role = %account.user.role, "Non-admin sign-in refused");
            return Err(AuthError::NotAdmin);
        }

        Ok(account.user)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = registration.email, role = %registration.role))]
    pub async fn register(&self, registration: &Registration<'_>) -> Result<AdminUser, AuthError> {
        let email = Email::parse(registration.email)?;

        if registration.password != registration.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(registration.password)?;

        let password_hash = hash_password(registration.password)?;

        let user = self
            .users
            .create(&email, registration.name, registration.role, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Check the password policy.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registration<'r>(email: &'r str, password: &'r str, role: UserRole) -> Registration<'r> {
        Registration {
            email,
            name: None,
            password,
            confirm_password: password,
            role,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter23", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword { min: 6 })
        ));
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(&registration("Boss@Example.org", "secret-pw", UserRole::Admin))
            .await
            .unwrap();

        let admin = auth.login("boss@example.org", "secret-pw").await.unwrap();
        assert_eq!(admin.email.as_str(), "boss@example.org");
        assert!(matches!(
            auth.login("boss@example.org", "wrong-pw").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_non_admin_is_refused() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(&registration("helper@example.org", "secret-pw", UserRole::User))
            .await
            .unwrap();

        let err = auth.login("helper@example.org", "secret-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::NotAdmin));
        assert_eq!(err.to_string(), "Access denied. Admin only.");
    }

    #[tokio::test]
    async fn test_register_rejects_mismatch_and_duplicates() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let mut mismatch = registration("a@example.org", "secret-pw", UserRole::Admin);
        mismatch.confirm_password = "secret-px";
        assert!(matches!(
            auth.register(&mismatch).await,
            Err(AuthError::PasswordMismatch)
        ));

        auth.register(&registration("a@example.org", "secret-pw", UserRole::Admin))
            .await
            .unwrap();
        let err = auth
            .register(&registration("A@example.org", "secret-pw", UserRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert!(err.to_string().contains("already registered"));
    }
}
