//! Assistance requests.

use serde::{Deserialize, Serialize};

use super::id::{RequestId, VolunteerId};
use super::status::RequestStatus;

/// A status change the current request state does not allow.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Completed requests never change status again.
    #[error("request is already completed")]
    Terminal,
    /// `Pending` while volunteers are still assigned.
    #[error("request still has assigned volunteers")]
    VolunteersAssigned,
    /// `Assigned` with nobody assigned.
    #[error("request has no assigned volunteers")]
    NoVolunteers,
    /// `Completed` straight from `Pending`.
    #[error("only assigned requests can be completed")]
    NotAssigned,
}

/// A request for assistance from a patient or family member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub details: String,
    pub status: RequestStatus,
    /// Volunteers linked to this request, in the order they were assigned.
    pub assigned_volunteers: Vec<VolunteerId>,
}

impl Request {
    /// Whether `volunteer` is already linked to this request.
    #[must_use]
    pub fn has_volunteer(&self, volunteer: &VolunteerId) -> bool {
        self.assigned_volunteers.contains(volunteer)
    }

    /// Case-insensitive match of `term` against the requester name.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        crate::listing::matches_search([self.name.as_str()], term)
    }

    /// Check that moving to `next` keeps status and assignments consistent.
    ///
    /// Setting the current status again is always accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] naming the rule the change would break.
    pub fn check_transition(&self, next: RequestStatus) -> Result<(), TransitionError> {
        if next == self.status {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal);
        }

        match next {
            RequestStatus::Pending if !self.assigned_volunteers.is_empty() => {
                Err(TransitionError::VolunteersAssigned)
            }
            RequestStatus::Assigned if self.assigned_volunteers.is_empty() => {
                Err(TransitionError::NoVolunteers)
            }
            RequestStatus::Completed if self.status != RequestStatus::Assigned => {
                Err(TransitionError::NotAssigned)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(status: RequestStatus, volunteers: &[&str]) -> Request {
        Request {
            id: RequestId::new("r1"),
            name: "Maria Lopez".to_owned(),
            email: "maria@example.org".to_owned(),
            phone: "555-0100".to_owned(),
            address: "12 Elm St".to_owned(),
            details: "Groceries twice a week".to_owned(),
            status,
            assigned_volunteers: volunteers.iter().map(|v| VolunteerId::new(*v)).collect(),
        }
    }

    #[test]
    fn test_search_is_case_insensitive_on_name() {
        let r = request(RequestStatus::Pending, &[]);
        assert!(r.matches_search("maria"));
        assert!(r.matches_search("LOPEZ"));
        assert!(r.matches_search(""));
        assert!(!r.matches_search("elm"));
    }

    #[test]
    fn test_completed_requires_assigned() {
        let pending = request(RequestStatus::Pending, &[]);
        assert_eq!(
            pending.check_transition(RequestStatus::Completed),
            Err(TransitionError::NotAssigned)
        );

        let assigned = request(RequestStatus::Assigned, &["v1"]);
        assert!(assigned.check_transition(RequestStatus::Completed).is_ok());
    }

    #[test]
    fn test_pending_refused_while_volunteers_linked() {
        let assigned = request(RequestStatus::Assigned, &["v1"]);
        assert_eq!(
            assigned.check_transition(RequestStatus::Pending),
            Err(TransitionError::VolunteersAssigned)
        );
    }

    #[test]
    fn test_assigned_needs_a_volunteer() {
        let pending = request(RequestStatus::Pending, &[]);
        assert_eq!(
            pending.check_transition(RequestStatus::Assigned),
            Err(TransitionError::NoVolunteers)
        );
    }

    #[test]
    fn test_completed_is_terminal() {
        let done = request(RequestStatus::Completed, &["v1"]);
        assert_eq!(
            done.check_transition(RequestStatus::Assigned),
            Err(TransitionError::Terminal)
        );
        assert!(done.check_transition(RequestStatus::Completed).is_ok());
    }

    #[test]
    fn test_has_volunteer() {
        let r = request(RequestStatus::Assigned, &["v1", "v2"]);
        assert!(r.has_volunteer(&VolunteerId::new("v2")));
        assert!(!r.has_volunteer(&VolunteerId::new("v3")));
    }
}
