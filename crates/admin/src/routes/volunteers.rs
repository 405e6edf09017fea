//! Volunteer route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use carelink_core::listing::list_volunteers;
use carelink_core::{Pagination, VerificationFilter, VolunteerId};

use super::{Layout, Pager, error_flash, parse_query};
use crate::components::listing::{
    DisplayMode, ListingGroup, ViewConfig, pending_volunteers_view, volunteers_view,
};
use crate::filters;
use crate::middleware::{RequireAdminAuth, push_flash};
use crate::models::{Flash, VolunteerViewState, session_keys};
use crate::state::AppState;

/// Pages an approve/remove form may send the admin back to.
const RETURN_PATHS: &[&str] = &["/volunteers", "/volunteers/pending"];

/// Listing query parameters. Anything omitted keeps its session value.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub q: Option<String>,
    pub page: Option<String>,
    pub view: Option<String>,
}

/// Form body of the approve and remove buttons.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnTo {
    pub next: Option<String>,
}

impl ReturnTo {
    fn path(&self) -> &str {
        self.next
            .as_deref()
            .filter(|p| RETURN_PATHS.contains(p))
            .unwrap_or("/volunteers")
    }
}

/// Volunteer listing template, shared by the roster and the approval queue.
#[derive(Template, WebTemplate)]
#[template(path = "volunteers/index.html")]
pub struct VolunteersIndexTemplate {
    pub layout: Layout,
    pub config: ViewConfig,
    pub groups: Vec<ListingGroup>,
    pub pager: Option<Pager>,
    pub filter_value: String,
    pub search: String,
    /// Where row action forms return to.
    pub return_to: &'static str,
}

fn apply_list_query(view: &mut VolunteerViewState, query: &ListQuery) -> Option<usize> {
    match query
        .filter
        .as_deref()
        .map(|s| s.trim().parse::<VerificationFilter>())
    {
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

/// Volunteer roster.
///
/// GET /volunteers
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> VolunteersIndexTemplate {
    let mut view: VolunteerViewState = session
        .get(session_keys::VOLUNTEER_VIEW)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let requested_page = apply_list_query(&mut view, &query);

    let mut pagination = Pagination::at(state.config().listing.volunteer_page_size, view.page);
    let page = list_volunteers(
        &state.volunteers().all(),
        view.filter,
        &view.search,
        &mut pagination,
        requested_page,
    );
    view.page = pagination.page();

    if let Err(e) = session.insert(session_keys::VOLUNTEER_VIEW, &view).await {
        tracing::warn!(error = %e, "Failed to store volunteer listing state");
    }

    let config = volunteers_view().display_mode(view.display);
    let groups = config.groups(&page.items);
    let pager = Some(Pager::for_page(&page, &config.base_path));

    VolunteersIndexTemplate {
        layout: Layout::new(admin, "/volunteers", &session, &state).await,
        groups,
        pager,
        filter_value: view.filter.as_str().to_string(),
        search: view.search,
        config,
        return_to: "/volunteers",
    }
}

/// Registrations awaiting approval, grouped by location.
///
/// GET /volunteers/pending
#[instrument(skip(admin, state, session))]
pub async fn pending(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> VolunteersIndexTemplate {
    let config = pending_volunteers_view();
    let groups = config.groups(&state.volunteers().pending_approval());

    VolunteersIndexTemplate {
        layout: Layout::new(admin, "/volunteers/pending", &session, &state).await,
        groups,
        pager: None,
        filter_value: String::new(),
        search: String::new(),
        config,
        return_to: "/volunteers/pending",
    }
}

/// Verify a volunteer.
///
/// POST /volunteers/{id}/approve
#[instrument(skip(_admin, state, session, form))]
pub async fn approve(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReturnTo>,
) -> Response {
    let id = VolunteerId::new(id);
    let flash = match state.volunteers().approve(&id).await {
        Ok(()) => {
            let name = state
                .volunteers()
                .get(&id)
                .map_or_else(|| "Volunteer".to_string(), |v| v.name);
            Flash::success(format!("{name} approved"))
        }
        Err(e) => error_flash(e),
    };

    push_flash(&session, flash).await;
    Redirect::to(form.path()).into_response()
}

/// Delete a volunteer. Requests keep the dangling reference.
///
/// POST /volunteers/{id}/remove
#[instrument(skip(_admin, state, session, form))]
pub async fn remove(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReturnTo>,
) -> Response {
    let id = VolunteerId::new(id);
    let flash = match state.volunteers().remove(&id).await {
        Ok(()) => Flash::success("Volunteer removed"),
        Err(e) => error_flash(e),
    };

    push_flash(&session, flash).await;
    Redirect::to(form.path()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_path_is_allow_listed() {
        let form = ReturnTo {
            next: Some("https://elsewhere.example".to_string()),
        };
        assert_eq!(form.path(), "/volunteers");

        let form = ReturnTo {
            next: Some("/volunteers/pending".to_string()),
        };
        assert_eq!(form.path(), "/volunteers/pending");
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = VolunteerViewState {
            page: 4,
            ..VolunteerViewState::default()
        };
        let query = ListQuery {
            filter: Some("Unverified".to_string()),
            ..ListQuery::default()
        };
        apply_list_query(&mut view, &query);
        assert_eq!(view.filter, VerificationFilter::Unverified);
        assert_eq!(view.page, 1);
    }
}
