//! Assignment workflow.
//!
//! Linking a volunteer to a request touches three documents: the request
//! (status and `assignedVolunteers`), the volunteer (`requestedUsers` and
//! status), and a new audit entry in `assignments`. All three go into one
//! batch guarded by the revisions both documents were read at, so a
//! concurrent writer makes the batch fail as a whole and the workflow reads
//! again and retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use carelink_core::{Request, RequestId, RequestStatus, Volunteer, VolunteerId, VolunteerStatus};

use crate::db::{
    Collection, DocumentStore, RepositoryError, RequestRepository, Versioned, VolunteerRepository,
    WriteBatch, assignments, requests, volunteers,
};

/// Default number of read-validate-commit rounds before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Limits applied to every assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPolicy {
    /// Most volunteers a single request may hold. `None` means no limit.
    pub capacity: Option<usize>,
    /// Commit attempts before reporting [`AssignmentError::Contention`].
    pub max_attempts: u32,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            capacity: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Reasons an assignment is refused.
#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("request not found")]
    RequestNotFound,

    #[error("volunteer not found")]
    VolunteerNotFound,

    #[error("volunteer has not been approved yet")]
    VolunteerNotVerified,

    #[error("request is already completed")]
    RequestCompleted,

    #[error("request already has {capacity} volunteers")]
    CapacityReached { capacity: usize },

    #[error("request kept changing; gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// The batch was committed.
    Assigned {
        request: Request,
        volunteer: Volunteer,
    },
    /// The volunteer was already linked. Nothing was written.
    AlreadyAssigned { request: Request },
}

impl AssignmentOutcome {
    /// The request as it stands after the call.
    #[must_use]
    pub const fn request(&self) -> &Request {
        match self {
            Self::Assigned { request, .. } | Self::AlreadyAssigned { request } => request,
        }
    }
}

/// What a validated assignment would do.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentPlan {
    AlreadyAssigned,
    Commit {
        batch: WriteBatch,
        request: Request,
        volunteer: Volunteer,
    },
}

/// Validate an assignment against freshly read documents and build the batch.
///
/// # Errors
///
/// Returns the first rule the pair breaks: unverified volunteer, completed
/// request, or a full request.
pub fn plan_assignment(
    request: &Versioned<Request>,
    volunteer: &Versioned<Volunteer>,
    policy: &AssignmentPolicy,
    assigned_by: &str,
    now: DateTime<Utc>,
) -> Result<AssignmentPlan, AssignmentError> {
    if !volunteer.record.is_eligible() {
        return Err(AssignmentError::VolunteerNotVerified);
    }
    if request.record.status == RequestStatus::Completed {
        return Err(AssignmentError::RequestCompleted);
    }
    if request.record.has_volunteer(&volunteer.record.id) {
        return Ok(AssignmentPlan::AlreadyAssigned);
    }
    if let Some(capacity) = policy
        .capacity
        .filter(|&c| request.record.assigned_volunteers.len() >= c)
    {
        return Err(AssignmentError::CapacityReached { capacity });
    }

    let mut updated_request = request.record.clone();
    updated_request
        .assigned_volunteers
        .push(volunteer.record.id.clone());
    updated_request.status = RequestStatus::Assigned;

    let mut updated_volunteer = volunteer.record.clone();
    if !updated_volunteer.requested_users.contains(&updated_request.id) {
        updated_volunteer
            .requested_users
            .push(updated_request.id.clone());
    }
    updated_volunteer.status = VolunteerStatus::Assigned;

    let batch = WriteBatch::new()
        .update_if(
            Collection::Requests,
            updated_request.id.as_str(),
            requests::assignment_fields(&updated_request.assigned_volunteers),
            request.revision,
        )
        .update_if(
            Collection::Volunteers,
            updated_volunteer.id.as_str(),
            volunteers::assignment_fields(&updated_volunteer.requested_users),
            volunteer.revision,
        )
        .create(
            Collection::Assignments,
            assignments::record_fields(
                &updated_request.id,
                &updated_volunteer.id,
                assigned_by,
                now,
            ),
        );

    Ok(AssignmentPlan::Commit {
        batch,
        request: updated_request,
        volunteer: updated_volunteer,
    })
}

/// Runs the read-validate-commit loop.
#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn DocumentStore>,
    policy: AssignmentPolicy,
}

impl AssignmentService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, policy: AssignmentPolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &AssignmentPolicy {
        &self.policy
    }

    /// Link `volunteer_id` to `request_id`.
    ///
    /// Calling this again with the same pair returns
    /// [`AssignmentOutcome::AlreadyAssigned`] and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an [`AssignmentError`] if either document is missing, a rule
    /// is broken, or the documents kept changing for `max_attempts` rounds.
    #[instrument(skip(self), fields(request_id = %request_id, volunteer_id = %volunteer_id))]
    pub async fn assign(
        &self,
        request_id: &RequestId,
        volunteer_id: &VolunteerId,
        assigned_by: &str,
    ) -> Result<AssignmentOutcome, AssignmentError> {
        let store = self.store.as_ref();
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            let request = RequestRepository::new(store)
                .get(request_id)
                .await?
                .ok_or(AssignmentError::RequestNotFound)?;
            let volunteer = VolunteerRepository::new(store)
                .get(volunteer_id)
                .await?
                .ok_or(AssignmentError::VolunteerNotFound)?;

            let (batch, assigned_request, assigned_volunteer) =
                match plan_assignment(&request, &volunteer, &self.policy, assigned_by, Utc::now())? {
                    AssignmentPlan::AlreadyAssigned => {
                        debug!("Volunteer already assigned");
                        return Ok(AssignmentOutcome::AlreadyAssigned {
                            request: request.record,
                        });
                    }
                    AssignmentPlan::Commit {
                        batch,
                        request,
                        volunteer,
                    } => (batch, request, volunteer),
                };

            match store.commit(batch).await {
                Ok(_) => {
                    info!(attempt, "Volunteer assigned");
                    return Ok(AssignmentOutcome::Assigned {
                        request: assigned_request,
                        volunteer: assigned_volunteer,
                    });
                }
                // Either document moved (or vanished) since we read it.
                Err(RepositoryError::Conflict(reason)) => {
                    debug!(attempt, %reason, "Assignment raced another writer; retrying");
                }
                Err(RepositoryError::NotFound) => {
                    debug!(attempt, "Document deleted mid-assignment; re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts, "Assignment gave up under contention");
        Err(AssignmentError::Contention { attempts })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::store::Write;

    fn request(volunteers: &[&str], status: RequestStatus) -> Versioned<Request> {
        Versioned {
            record: Request {
                id: RequestId::new("r1"),
                name: "June".to_owned(),
                email: String::new(),
                phone: String::new(),
                address: String::new(),
                details: String::new(),
                status,
                assigned_volunteers: volunteers.iter().map(|v| VolunteerId::new(*v)).collect(),
            },
            revision: 4,
        }
    }

    fn volunteer(id: &str, verified: bool) -> Versioned<Volunteer> {
        Versioned {
            record: Volunteer {
                id: VolunteerId::new(id),
                name: "Ravi".to_owned(),
                email: String::new(),
                phone: String::new(),
                location: String::new(),
                verified,
                requested_users: Vec::new(),
                status: VolunteerStatus::Available,
            },
            revision: 9,
        }
    }

    fn plan(
        r: &Versioned<Request>,
        v: &Versioned<Volunteer>,
        policy: AssignmentPolicy,
    ) -> Result<AssignmentPlan, AssignmentError> {
        plan_assignment(r, v, &policy, "admin@example.org", Utc::now())
    }

    #[test]
    fn test_plan_guards_both_revisions() {
        let result = plan(
            &request(&[], RequestStatus::Pending),
            &volunteer("v1", true),
            AssignmentPolicy::default(),
        )
        .unwrap();

        let AssignmentPlan::Commit {
            batch,
            request,
            volunteer,
        } = result
        else {
            panic!("expected a commit plan");
        };

        assert_eq!(request.status, RequestStatus::Assigned);
        assert_eq!(request.assigned_volunteers, [VolunteerId::new("v1")]);
        assert_eq!(volunteer.requested_users, [RequestId::new("r1")]);
        assert_eq!(volunteer.status, VolunteerStatus::Assigned);

        let revisions: Vec<Option<i64>> = batch
            .writes()
            .iter()
            .filter_map(|w| match w {
                Write::Update {
                    expected_revision, ..
                } => Some(*expected_revision),
                _ => None,
            })
            .collect();
        assert_eq!(revisions, [Some(4), Some(9)]);
        assert_eq!(
            batch.collections(),
            [
                Collection::Requests,
                Collection::Volunteers,
                Collection::Assignments
            ]
        );
    }

    #[test]
    fn test_plan_refuses_unverified_volunteer() {
        let result = plan(
            &request(&[], RequestStatus::Pending),
            &volunteer("v1", false),
            AssignmentPolicy::default(),
        );
        assert!(matches!(result, Err(AssignmentError::VolunteerNotVerified)));
    }

    #[test]
    fn test_plan_refuses_completed_request() {
        let result = plan(
            &request(&["v0"], RequestStatus::Completed),
            &volunteer("v1", true),
            AssignmentPolicy::default(),
        );
        assert!(matches!(result, Err(AssignmentError::RequestCompleted)));
    }

    #[test]
    fn test_plan_is_idempotent_even_at_capacity() {
        let policy = AssignmentPolicy {
            capacity: Some(1),
            ..AssignmentPolicy::default()
        };
        let result = plan(
            &request(&["v1"], RequestStatus::Assigned),
            &volunteer("v1", true),
            policy,
        )
        .unwrap();
        assert_eq!(result, AssignmentPlan::AlreadyAssigned);
    }

    #[test]
    fn test_plan_enforces_capacity() {
        let policy = AssignmentPolicy {
            capacity: Some(1),
            ..AssignmentPolicy::default()
        };
        let result = plan(
            &request(&["v0"], RequestStatus::Assigned),
            &volunteer("v1", true),
            policy,
        );
        assert!(matches!(
            result,
            Err(AssignmentError::CapacityReached { capacity: 1 })
        ));
    }

    #[test]
    fn test_plan_does_not_duplicate_back_reference() {
        let mut v = volunteer("v1", true);
        v.record.requested_users.push(RequestId::new("r1"));
        let AssignmentPlan::Commit { volunteer, .. } = plan(
            &request(&[], RequestStatus::Pending),
            &v,
            AssignmentPolicy::default(),
        )
        .unwrap() else {
            panic!("expected a commit plan");
        };
        assert_eq!(volunteer.requested_users, [RequestId::new("r1")]);
    }
}
