//! Business logic services for admin.
//!
//! # Services
//!
//! - `assignment` - Revision-checked request/volunteer assignment
//! - `auth` - Email and password sign-in for admin accounts
//! - `requests` - Request status changes and deletion

pub mod assignment;
pub mod auth;
pub mod requests;

pub use assignment::{
    AssignmentError, AssignmentOutcome, AssignmentPolicy, AssignmentService, plan_assignment,
};
pub use auth::{AuthError, AuthService, Registration};
pub use requests::StatusError;
