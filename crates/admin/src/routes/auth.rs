//! Authentication route handlers for admin.
//!
//! Email and password sign-in for `admin` accounts, sign-out, and account
//! creation by an already signed-in admin.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use carelink_core::UserRole;

use super::Layout;
use crate::filters;
use crate::middleware::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, push_flash, set_current_admin,
};
use crate::models::{CurrentAdmin, Flash};
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<String>,
    pub email: String,
    pub name: String,
    pub roles: Vec<RoleOption>,
}

/// Entry in the role dropdown.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub value: &'static str,
    pub selected: bool,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in admins go straight to the dashboard.
///
/// GET /login
pub async fn login_page(OptionalAdminAuth(admin): OptionalAdminAuth) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        error: None,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
///
/// POST /login
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let result = AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await;

    let (status, message) = match result {
        Ok(user) => {
            let admin = CurrentAdmin::from(&user);
            if let Err(e) = set_current_admin(&session, &admin).await {
                tracing::error!(error = %e, "Failed to set session");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    LoginTemplate {
                        error: Some("Could not start a session. Please try again.".to_string()),
                        email: form.email,
                    },
                )
                    .into_response();
            }
            tracing::info!(user_id = %admin.id, "Admin signed in");
            return Redirect::to("/").into_response();
        }
        Err(AuthError::NotAdmin) => {
            // Signed in as a non-admin: sign straight back out.
            if let Err(e) = clear_current_admin(&session).await {
                tracing::warn!(error = %e, "Failed to flush session after refused login");
            }
            (StatusCode::FORBIDDEN, AuthError::NotAdmin.to_string())
        }
        Err(e) if e.is_user_facing() => {
            tracing::warn!(error = %e, "Login failed");
            (StatusCode::UNAUTHORIZED, AuthError::InvalidCredentials.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Login error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Sign-in is unavailable right now.".to_string(),
            )
        }
    };

    (
        status,
        LoginTemplate {
            error: Some(message),
            email: form.email,
        },
    )
        .into_response()
}

/// Logout and clear session.
///
/// POST /logout
pub async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to flush session on logout");
    }
    Redirect::to("/login")
}

// =============================================================================
// Registration Routes
// =============================================================================

fn role_options(selected: &str) -> Vec<RoleOption> {
    [UserRole::Admin, UserRole::User]
        .into_iter()
        .map(|role| RoleOption {
            value: role.as_str(),
            selected: role.as_str() == selected,
        })
        .collect()
}

/// Display the registration page.
///
/// GET /register
pub async fn register_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    RegisterTemplate {
        layout: Layout::new(admin, "/register", &session, &state).await,
        error: None,
        email: String::new(),
        name: String::new(),
        roles: role_options(UserRole::Admin.as_str()),
    }
}

/// Handle registration form submission.
///
/// POST /register
#[instrument(skip(admin, state, session, form), fields(email = %form.email))]
pub async fn register(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let result = match form.role.parse::<UserRole>() {
        Err(e) => Err(e.to_string()),
        Ok(role) => {
            let name = form.name.trim();
            AuthService::new(state.store())
                .register(&Registration {
                    email: &form.email,
                    name: (!name.is_empty()).then_some(name),
                    password: &form.password,
                    confirm_password: &form.confirm_password,
                    role,
                })
                .await
                .map_err(|e| {
                    if e.is_user_facing() {
                        e.to_string()
                    } else {
                        tracing::error!(error = %e, "Registration error");
                        "Could not create the account. Please try again.".to_string()
                    }
                })
        }
    };

    match result {
        Ok(user) => {
            push_flash(
                &session,
                Flash::success(format!("Account created for {}", user.email)),
            )
            .await;
            Redirect::to("/register").into_response()
        }
        Err(message) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                layout: Layout::new(admin, "/register", &session, &state).await,
                error: Some(message),
                email: form.email,
                name: form.name,
                roles: role_options(&form.role),
            },
        )
            .into_response(),
    }
}
