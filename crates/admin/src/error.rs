//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use carelink_core::UserId;

use crate::db::RepositoryError;
use crate::services::{AssignmentError, AuthError, StatusError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Assignment was refused or could not be committed.
    #[error("Assignment failed: {0}")]
    Assignment(#[from] AssignmentError),

    /// Status change was refused.
    #[error("Status change failed: {0}")]
    Status(#[from] StatusError),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound)
            | Self::Assignment(AssignmentError::RequestNotFound | AssignmentError::VolunteerNotFound)
            | Self::Status(StatusError::NotFound)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Assignment(
                AssignmentError::Contention { .. }
                | AssignmentError::CapacityReached { .. }
                | AssignmentError::RequestCompleted
                | AssignmentError::Repository(RepositoryError::Conflict(_)),
            )
            | Self::Status(StatusError::Repository(RepositoryError::Conflict(_))) => {
                StatusCode::CONFLICT
            }
            Self::Assignment(AssignmentError::VolunteerNotVerified)
            | Self::Status(StatusError::Transition(_))
            | Self::BadRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
            | Self::Database(_)
            | Self::Assignment(AssignmentError::Repository(_))
            | Self::Status(StatusError::Repository(_))
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthError::NotAdmin) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Auth(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether this is our fault rather than the caller's.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: &UserId, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
