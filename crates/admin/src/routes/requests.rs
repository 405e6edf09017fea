//! Request route handlers.
//!
//! The listing keeps its page, filter, search, and display mode in the
//! session, so an out-of-range `?page=` leaves the previous page showing.
//! Every write redirects back with a flash notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use carelink_core::{
    Pagination, Request, RequestId, RequestStatus, StatusFilter, Volunteer, VolunteerId,
};

use super::{Layout, Pager, error_flash, parse_query};
use crate::components::listing::{DisplayMode, ListingGroup, ViewConfig, requests_view};
use crate::db::AssignmentRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAdminAuth, push_flash};
use crate::models::{Flash, RequestViewState, session_keys};
use crate::services::{AssignmentOutcome, requests as request_service};
use crate::state::AppState;

// =============================================================================
// Query and Form Types
// =============================================================================

/// Listing query parameters. Anything omitted keeps its session value.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<String>,
    pub view: Option<String>,
}

/// Assignment form data.
#[derive(Debug, Deserialize)]
pub struct AssignForm {
    pub volunteer_id: String,
}

/// Status form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Request listing template.
#[derive(Template, WebTemplate)]
#[template(path = "requests/index.html")]
pub struct RequestsIndexTemplate {
    pub layout: Layout,
    pub config: ViewConfig,
    pub groups: Vec<ListingGroup>,
    pub pager: Option<Pager>,
    pub filter_value: String,
    pub search: String,
    /// Where row action forms return to.
    pub return_to: &'static str,
}

/// Volunteer as shown on a request's detail page.
#[derive(Debug, Clone)]
pub struct AssignedVolunteerView {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `false` when the volunteer was deleted after being assigned.
    pub exists: bool,
}

/// One audit entry.
#[derive(Debug, Clone)]
pub struct AssignmentHistoryView {
    pub volunteer: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
}

/// Request detail template.
#[derive(Template, WebTemplate)]
#[template(path = "requests/show.html")]
pub struct RequestShowTemplate {
    pub layout: Layout,
    pub request: Request,
    pub assigned: Vec<AssignedVolunteerView>,
    /// Verified volunteers not yet on this request.
    pub candidates: Vec<Volunteer>,
    pub history: Vec<AssignmentHistoryView>,
    /// Statuses the request may move to from here.
    pub next_statuses: Vec<&'static str>,
    pub at_capacity: bool,
}

// =============================================================================
// Listing
// =============================================================================

/// Apply query changes to the remembered listing state.
///
/// Returns the page the query asked for, if any. A new filter or search term
/// starts again from page 1.
fn apply_list_query(view: &mut RequestViewState, query: &ListQuery) -> Option<usize> {
    // Blank means All; unknown values leave the filter alone.
    match query.status.as_deref().map(|s| s.trim().parse::<StatusFilter>()) {
        Some(Ok(filter)) if filter != view.filter => {
            view.filter = filter;
            view.page = 1;
        }
        _ => {}
    }
    if let Some(q) = &query.q {
        let q = q.trim();
        if q != view.search {
            view.search = q.to_string();
            view.page = 1;
        }
    }
    if let Some(display) = parse_query::<DisplayMode>(query.view.as_deref()) {
        view.display = display;
    }
    parse_query(query.page.as_deref())
}

/// Request listing.
///
/// GET /requests
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> RequestsIndexTemplate {
    let mut view: RequestViewState = session
        .get(session_keys::REQUEST_VIEW)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let requested_page = apply_list_query(&mut view, &query);

    let mut pagination = Pagination::at(state.config().listing.request_page_size, view.page);
    let page = state
        .requests()
        .list(view.filter, &view.search, &mut pagination, requested_page);
    view.page = pagination.page();

    if let Err(e) = session.insert(session_keys::REQUEST_VIEW, &view).await {
        tracing::warn!(error = %e, "Failed to store request listing state");
    }

    let config = requests_view().display_mode(view.display);
    let groups = config.groups(&page.items);
    let pager = Some(Pager::for_page(&page, &config.base_path));

    RequestsIndexTemplate {
        layout: Layout::new(admin, "/requests", &session, &state).await,
        groups,
        pager,
        filter_value: view.filter.as_str().to_string(),
        search: view.search,
        config,
        return_to: "/requests",
    }
}

// =============================================================================
// Detail
// =============================================================================

/// Statuses reachable from `request`'s current state.
fn next_statuses(request: &Request) -> Vec<&'static str> {
    RequestStatus::ALL
        .into_iter()
        .filter(|&s| s != request.status && request.check_transition(s).is_ok())
        .map(RequestStatus::as_str)
        .collect()
}

/// Request detail with the assignment picker.
///
/// GET /requests/{id}
#[instrument(skip(admin, state, session))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<RequestShowTemplate, AppError> {
    let id = RequestId::new(id);
    let request = state
        .requests()
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id}")))?;

    let directory = state.volunteers();
    let assigned = request
        .assigned_volunteers
        .iter()
        .map(|vid| match directory.get(vid) {
            Some(v) => AssignedVolunteerView {
                id: v.id.to_string(),
                name: v.name,
                email: v.email,
                exists: true,
            },
            None => AssignedVolunteerView {
                id: vid.to_string(),
                name: "Removed volunteer".to_string(),
                email: String::new(),
                exists: false,
            },
        })
        .collect();

    let candidates = directory
        .eligible()
        .into_iter()
        .filter(|v| !request.has_volunteer(&v.id))
        .collect();

    let history = AssignmentRepository::new(state.store())
        .for_request(&id)
        .await?
        .into_iter()
        .map(|record| AssignmentHistoryView {
            volunteer: directory
                .get(&record.volunteer_id)
                .map_or_else(|| record.volunteer_id.to_string(), |v| v.name),
            assigned_by: record.assigned_by,
            assigned_at: record.assigned_at,
        })
        .collect();

    let at_capacity = state
        .assignments()
        .policy()
        .capacity
        .is_some_and(|c| request.assigned_volunteers.len() >= c);

    Ok(RequestShowTemplate {
        layout: Layout::new(admin, "/requests", &session, &state).await,
        next_statuses: next_statuses(&request),
        request,
        assigned,
        candidates,
        history,
        at_capacity,
    })
}

// =============================================================================
// Writes
// =============================================================================

/// Where a write on `id` lands: the detail page of a known request, otherwise
/// the listing. Unknown ids never reach a `Location` header.
fn return_path(state: &AppState, id: &RequestId) -> String {
    if state.requests().get(id).is_some() {
        format!("/requests/{id}")
    } else {
        "/requests".to_string()
    }
}

/// Assign a volunteer.
///
/// POST /requests/{id}/assign
#[instrument(skip(admin, state, session, form), fields(volunteer_id = %form.volunteer_id))]
pub async fn assign(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<AssignForm>,
) -> Response {
    let request_id = RequestId::new(id);
    let volunteer_id = VolunteerId::new(form.volunteer_id);

    let flash = match state
        .assignments()
        .assign(&request_id, &volunteer_id, admin.email.as_str())
        .await
    {
        Ok(AssignmentOutcome::Assigned { request, volunteer }) => {
            let message = format!("{} assigned to {}", volunteer.name, request.name);
            state.requests().apply(request);
            state.volunteers().apply(volunteer);
            Flash::success(message)
        }
        Ok(AssignmentOutcome::AlreadyAssigned { .. }) => {
            Flash::success("That volunteer is already assigned to this request")
        }
        Err(e) => error_flash(e),
    };

    push_flash(&session, flash).await;
    Redirect::to(&return_path(&state, &request_id)).into_response()
}

/// Change a request's status.
///
/// POST /requests/{id}/status
#[instrument(skip(_admin, state, session, form), fields(status = %form.status))]
pub async fn update_status(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let request_id = RequestId::new(id);

    let flash = match form.status.parse::<RequestStatus>() {
        Err(e) => Flash::error(e.to_string()),
        Ok(status) => {
            match request_service::update_status(state.store(), &request_id, status).await {
                Ok(request) => {
                    let message = format!("{} is now {}", request.name, request.status);
                    state.requests().apply(request);
                    Flash::success(message)
                }
                Err(e) => error_flash(e),
            }
        }
    };

    push_flash(&session, flash).await;
    Redirect::to(&return_path(&state, &request_id)).into_response()
}

/// Permanently delete a request.
///
/// POST /requests/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Response {
    let request_id = RequestId::new(id);

    let flash = match request_service::delete(state.store(), &request_id).await {
        Ok(()) => {
            state.requests().forget(&request_id);
            Flash::success("Request deleted")
        }
        Err(e) => error_flash(e),
    };

    push_flash(&session, flash).await;
    Redirect::to("/requests").into_response()
}
