//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use carelink_core::{DashboardSummary, Request, RequestStatus, Volunteer};

use super::Layout;
use crate::{filters, middleware::RequireAdminAuth, state::AppState};

/// Rows shown in each dashboard panel.
const PANEL_SIZE: usize = 5;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub summary: DashboardSummary,
    /// Oldest pending requests first.
    pub waiting_requests: Vec<Request>,
    pub awaiting_approval: Vec<Volunteer>,
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip(admin, state, session))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> DashboardTemplate {
    let waiting_requests = state
        .requests()
        .all()
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .take(PANEL_SIZE)
        .collect();
    let awaiting_approval = state
        .volunteers()
        .pending_approval()
        .into_iter()
        .take(PANEL_SIZE)
        .collect();

    DashboardTemplate {
        layout: Layout::new(admin, "/", &session, &state).await,
        summary: state.summary(),
        waiting_requests,
        awaiting_approval,
    }
}
