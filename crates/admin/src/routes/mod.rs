//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness (projections live, database reachable)
//!
//! # Auth
//! GET  /login                    - Login page
//! POST /login                    - Email + password sign-in (admin role only)
//! POST /logout                   - Sign out
//! GET  /register                 - Account creation form (admins only)
//! POST /register                 - Create account
//!
//! # Dashboard
//! GET  /                         - Summary counts
//! GET  /api/live/summary         - Server-sent summary updates
//!
//! # Requests
//! GET  /requests                 - Listing (?status, ?q, ?page, ?view)
//! GET  /requests/{id}            - Detail with volunteer picker
//! POST /requests/{id}/assign     - Assign a verified volunteer
//! POST /requests/{id}/status     - Change status
//! POST /requests/{id}/delete     - Delete permanently
//!
//! # Volunteers
//! GET  /volunteers               - Listing (?filter, ?q, ?page, ?view)
//! GET  /volunteers/pending       - Registrations awaiting approval
//! POST /volunteers/{id}/approve  - Verify
//! POST /volunteers/{id}/remove   - Delete
//!
//! # Messages
//! GET  /chat                     - Volunteer picker and thread (?q, ?volunteer)
//! POST /chat/{volunteer_id}/messages - Send a message
//! ```

pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod health;
pub mod live;
pub mod requests;
pub mod volunteers;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_sessions::{Session, SessionStore};

use carelink_core::Page;

use crate::error::AppError;
use crate::middleware::{
    create_session_layer, request_id_middleware, security_headers_middleware, take_flash,
};
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;

/// Directory static assets are served from, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/admin/static";

/// Create all routes for the admin dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/", get(dashboard::dashboard))
        .route("/api/live/summary", get(live::summary_events))
        .nest("/requests", request_routes())
        .nest("/volunteers", volunteer_routes())
        .route("/chat", get(chat::index))
        .route("/chat/{volunteer_id}/messages", post(chat::send))
}

/// Create the request routes router.
pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(requests::index))
        .route("/{id}", get(requests::show))
        .route("/{id}/assign", post(requests::assign))
        .route("/{id}/status", post(requests::update_status))
        .route("/{id}/delete", post(requests::delete))
}

/// Create the volunteer routes router.
pub fn volunteer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(volunteers::index))
        .route("/pending", get(volunteers::pending))
        .route("/{id}/approve", post(volunteers::approve))
        .route("/{id}/remove", post(volunteers::remove))
}

/// Assemble the application: routes, static files, sessions, and headers.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes()
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

// =============================================================================
// Shared view types
// =============================================================================

/// Chrome shared by every signed-in page.
#[derive(Debug, Clone)]
pub struct Layout {
    pub admin: CurrentAdmin,
    /// Highlights the active nav entry.
    pub current_path: &'static str,
    pub flash: Option<Flash>,
    /// Whether both projections are receiving snapshots.
    pub live: bool,
}

impl Layout {
    /// Build the layout, consuming any pending flash notice.
    pub async fn new(
        admin: CurrentAdmin,
        current_path: &'static str,
        session: &Session,
        state: &AppState,
    ) -> Self {
        Self {
            admin,
            current_path,
            flash: take_flash(session).await,
            live: state.is_live(),
        }
    }
}

/// Previous/next links for a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl Pager {
    /// Links keep the filter and search in the session, so only `page` is needed.
    #[must_use]
    pub fn for_page<T>(page: &Page<T>, base_path: &str) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages,
            total_items: page.total_items,
            prev_href: page
                .has_previous()
                .then(|| format!("{base_path}?page={}", page.page - 1)),
            next_href: page
                .has_next()
                .then(|| format!("{base_path}?page={}", page.page + 1)),
        }
    }
}

/// Turn a failed write into a notice for the next page.
///
/// Server-side failures are reported to Sentry and shown generically.
pub fn error_flash(error: impl Into<AppError>) -> Flash {
    let error = error.into();
    if error.is_server_error() {
        let event_id = sentry::capture_error(&error);
        tracing::error!(error = %error, sentry_event_id = %event_id, "Admin action failed");
        Flash::error("Something went wrong. Please try again.")
    } else {
        tracing::info!(error = %error, "Admin action refused");
        Flash::error(error.to_string())
    }
}

/// Parse an optional query value, ignoring blanks and anything unparseable.
fn parse_query<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}
