//! Assignment workflow against live projections.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use carelink_admin::db::AssignmentRepository;
use carelink_admin::services::{AssignmentError, AssignmentOutcome};
use carelink_core::{RequestId, RequestStatus, VolunteerId, VolunteerStatus};
use carelink_integration_tests::{TestContext, test_config};

const ASSIGNED_BY: &str = "coordinator@example.org";

#[tokio::test]
async fn test_assignment_reaches_both_projections() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;

    let outcome = ctx
        .state
        .assignments()
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap();
    assert!(matches!(outcome, AssignmentOutcome::Assigned { .. }));

    let requests = ctx
        .requests_where(|rs| rs.iter().any(|r| r.status == RequestStatus::Assigned))
        .await;
    assert_eq!(requests[0].assigned_volunteers, [volunteer_id.clone()]);

    let volunteers = ctx
        .volunteers_where(|vs| vs.iter().any(|v| v.status == VolunteerStatus::Assigned))
        .await;
    assert_eq!(volunteers[0].requested_users, [request_id.clone()]);

    let history = AssignmentRepository::new(ctx.store())
        .for_request(&request_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].assigned_by, ASSIGNED_BY);
}

#[tokio::test]
async fn test_assigning_twice_is_idempotent() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    let assignments = ctx.state.assignments();

    assignments
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap();
    let second = assignments
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap();

    assert!(matches!(second, AssignmentOutcome::AlreadyAssigned { .. }));
    assert_eq!(second.request().assigned_volunteers.len(), 1);

    let history = AssignmentRepository::new(ctx.store())
        .for_request(&request_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_unverified_volunteer_is_refused_until_approved() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let volunteer_id = ctx.add_volunteer("Sam Ortiz", "sam@example.org", false).await;

    ctx.volunteers_where(|vs| vs.len() == 1).await;
    assert!(ctx.state.volunteers().eligible().is_empty());
    assert_eq!(ctx.state.volunteers().pending_approval().len(), 1);

    let err = ctx
        .state
        .assignments()
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap_err();
    assert!(matches!(err, AssignmentError::VolunteerNotVerified));

    ctx.state.volunteers().approve(&volunteer_id).await.unwrap();
    ctx.volunteers_where(|vs| vs.iter().all(|v| v.verified)).await;
    assert_eq!(ctx.state.volunteers().eligible().len(), 1);
    assert!(ctx.state.volunteers().pending_approval().is_empty());

    ctx.state
        .assignments()
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_capacity_limits_volunteers_per_request() {
    let ctx = TestContext::with_config(test_config(&[("ASSIGNMENT_CAPACITY", "1")]));
    let request_id = ctx.add_request("Ana Ruiz").await;
    let first = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    let second = ctx.add_volunteer("Marcus Bell", "marcus@example.org", true).await;
    let assignments = ctx.state.assignments();

    assignments.assign(&request_id, &first, ASSIGNED_BY).await.unwrap();
    let err = assignments
        .assign(&request_id, &second, ASSIGNED_BY)
        .await
        .unwrap_err();
    assert!(matches!(err, AssignmentError::CapacityReached { capacity: 1 }));

    // Re-assigning the volunteer already there is still fine.
    let again = assignments.assign(&request_id, &first, ASSIGNED_BY).await.unwrap();
    assert!(matches!(again, AssignmentOutcome::AlreadyAssigned { .. }));
}

#[tokio::test]
async fn test_concurrent_assignments_both_land() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let kim = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    let marcus = ctx.add_volunteer("Marcus Bell", "marcus@example.org", true).await;

    let a = ctx.state.assignments().clone();
    let b = ctx.state.assignments().clone();
    let (r1, k) = (request_id.clone(), kim.clone());
    let (r2, m) = (request_id.clone(), marcus.clone());
    let first = tokio::spawn(async move { a.assign(&r1, &k, ASSIGNED_BY).await });
    let second = tokio::spawn(async move { b.assign(&r2, &m, ASSIGNED_BY).await });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let requests = ctx
        .requests_where(|rs| rs.iter().any(|r| r.assigned_volunteers.len() == 2))
        .await;
    let request = &requests[0];
    assert!(request.has_volunteer(&kim));
    assert!(request.has_volunteer(&marcus));
    assert_eq!(request.status, RequestStatus::Assigned);
}

#[tokio::test]
async fn test_completed_request_takes_no_more_volunteers() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let kim = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    let marcus = ctx.add_volunteer("Marcus Bell", "marcus@example.org", true).await;

    ctx.state
        .assignments()
        .assign(&request_id, &kim, ASSIGNED_BY)
        .await
        .unwrap();
    carelink_admin::services::requests::update_status(
        ctx.store(),
        &request_id,
        RequestStatus::Completed,
    )
    .await
    .unwrap();

    let err = ctx
        .state
        .assignments()
        .assign(&request_id, &marcus, ASSIGNED_BY)
        .await
        .unwrap_err();
    assert!(matches!(err, AssignmentError::RequestCompleted));
}

#[tokio::test]
async fn test_deleted_volunteer_leaves_dangling_reference() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;

    ctx.state
        .assignments()
        .assign(&request_id, &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap();
    ctx.state.volunteers().remove(&volunteer_id).await.unwrap();

    ctx.volunteers_where(|vs| vs.is_empty()).await;
    let requests = ctx
        .requests_where(|rs| rs.iter().any(|r| !r.assigned_volunteers.is_empty()))
        .await;
    assert_eq!(requests[0].assigned_volunteers, [volunteer_id.clone()]);
    assert!(ctx.state.volunteers().get(&volunteer_id).is_none());
}

#[tokio::test]
async fn test_missing_documents_are_reported() {
    let ctx = TestContext::new();
    let request_id = ctx.add_request("Ana Ruiz").await;
    let assignments = ctx.state.assignments();

    let err = assignments
        .assign(&request_id, &VolunteerId::new("nobody"), ASSIGNED_BY)
        .await
        .unwrap_err();
    assert!(matches!(err, AssignmentError::VolunteerNotFound));

    let volunteer_id = ctx.add_volunteer("Kim Lee", "kim@example.org", true).await;
    let err = assignments
        .assign(&RequestId::new("gone"), &volunteer_id, ASSIGNED_BY)
        .await
        .unwrap_err();
    assert!(matches!(err, AssignmentError::RequestNotFound));
}
