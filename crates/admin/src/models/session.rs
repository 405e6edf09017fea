//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication and listing state.

use serde::{Deserialize, Serialize};

use carelink_core::{Email, StatusFilter, UserId, UserRole, VerificationFilter};

use super::admin_user::AdminUser;
use crate::components::listing::DisplayMode;

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Account ID in the `users` collection.
    pub id: UserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Role at sign-in time.
    pub role: UserRole,
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Remembered state of the request listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestViewState {
    pub page: usize,
    pub filter: StatusFilter,
    pub search: String,
    pub display: DisplayMode,
}

/// Remembered state of the volunteer listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolunteerViewState {
    pub page: usize,
    pub filter: VerificationFilter,
    pub search: String,
    pub display: DisplayMode,
}

/// Tone of a [`Flash`] notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    /// CSS class suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One-shot notice shown after a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the request listing's page, filter, and search.
    pub const REQUEST_VIEW: &str = "request_view";

    /// Key for the volunteer listing's page, filter, and search.
    pub const VOLUNTEER_VIEW: &str = "volunteer_view";

    /// Key for a one-shot notice shown on the next page render.
    pub const FLASH: &str = "flash";
}
