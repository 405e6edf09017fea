//! Status enums for requests, volunteers, and admin accounts.
//!
//! Statuses are stored as plain strings inside documents. Parsing them into
//! closed enums at the read and write boundaries keeps typos like
//! `"assigned"` or `"Done"` from ever reaching the store.

use serde::{Deserialize, Serialize};

/// A status string that does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownStatus {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl UnknownStatus {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Lifecycle of an assistance request.
///
/// `Pending` until a volunteer is assigned, then `Assigned`. `Completed` is
/// terminal and is only reachable from `Assigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RequestStatus {
    #[default]
    Pending,
    Assigned,
    Completed,
}

impl RequestStatus {
    /// All variants in display order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Assigned, Self::Completed];

    /// The string stored in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Assigned => "Assigned",
            Self::Completed => "Completed",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Assigned" => Ok(Self::Assigned),
            "Completed" => Ok(Self::Completed),
            _ => Err(UnknownStatus::new("request status", s)),
        }
    }
}

/// Whether a volunteer currently holds at least one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VolunteerStatus {
    #[default]
    Available,
    Assigned,
}

impl VolunteerStatus {
    /// The string stored in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Assigned => "Assigned",
        }
    }
}

impl std::fmt::Display for VolunteerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VolunteerStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(Self::Available),
            "Assigned" => Ok(Self::Assigned),
            _ => Err(UnknownStatus::new("volunteer status", s)),
        }
    }
}

/// Role stored on an account in the `users` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// May sign in to the dashboard.
    Admin,
    /// Registered but refused by the dashboard.
    User,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Whether this role may use the dashboard.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(UnknownStatus::new("user role", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_status_parses_stored_spelling() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_request_status_is_case_sensitive() {
        let err = "assigned".parse::<RequestStatus>().unwrap_err();
        assert_eq!(err.value, "assigned");
        assert_eq!(err.to_string(), "invalid request status: assigned");
    }

    #[test]
    fn test_request_status_defaults_to_pending() {
        assert_eq!(RequestStatus::default(), RequestStatus::Pending);
        assert!(RequestStatus::Completed.is_terminal());
        assert!(!RequestStatus::Assigned.is_terminal());
    }

    #[test]
    fn test_request_status_serde_uses_variant_names() {
        let json = serde_json::to_string(&RequestStatus::Completed).unwrap();
        assert_eq!(json, "\"Completed\"");
    }

    #[test]
    fn test_user_role_round_trips_lowercase() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::User.to_string(), "user");
        assert!("Admin".parse::<UserRole>().is_err());
    }
}
