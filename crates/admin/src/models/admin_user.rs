//! Dashboard account domain types.

use chrono::{DateTime, Utc};

use carelink_core::{Email, UserId, UserRole};

/// An account in the `users` collection (domain type).
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// Store-assigned account ID.
    pub id: UserId,
    /// Login email, stored lowercase.
    pub email: Email,
    /// Name shown on messages this account sends.
    pub name: String,
    /// Only `admin` accounts may use the dashboard.
    pub role: UserRole,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// An account together with its Argon2id password hash.
///
/// Kept separate from [`AdminUser`] so the hash never ends up in a session.
#[derive(Debug, Clone)]
pub struct AdminUserWithPassword {
    pub user: AdminUser,
    pub password_hash: String,
}

/// Display name for accounts created without one: the email's local part.
#[must_use]
pub fn default_display_name(email: &Email) -> String {
    email
        .as_str()
        .split_once('@')
        .map_or_else(|| email.to_string(), |(local, _)| local.to_owned())
}
