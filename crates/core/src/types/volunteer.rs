//! Volunteer registrations.

use serde::{Deserialize, Serialize};

use super::id::{RequestId, VolunteerId};
use super::status::VolunteerStatus;

/// A person who signed up to help.
///
/// New registrations arrive unverified and stay out of assignment pickers
/// until an admin approves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: VolunteerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub verified: bool,
    /// Requests this volunteer was assigned to. Mirrors
    /// `Request::assigned_volunteers` but is not authoritative.
    pub requested_users: Vec<RequestId>,
    pub status: VolunteerStatus,
}

impl Volunteer {
    /// Whether this volunteer may be offered for assignment.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.verified
    }

    /// Case-insensitive match of `term` against name or email.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        crate::listing::matches_search([self.name.as_str(), self.email.as_str()], term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_matches_name_or_email() {
        let v = Volunteer {
            id: VolunteerId::new("v1"),
            name: "Sam Carter".to_owned(),
            email: "sam.helper@example.org".to_owned(),
            phone: String::new(),
            location: "Northside".to_owned(),
            verified: false,
            requested_users: Vec::new(),
            status: VolunteerStatus::Available,
        };

        assert!(v.matches_search("carter"));
        assert!(v.matches_search("HELPER@"));
        assert!(!v.matches_search("northside"));
        assert!(!v.is_eligible());
    }
}
