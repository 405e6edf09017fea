//! Domain models for admin.

pub mod admin_user;
pub mod session;

pub use admin_user::{AdminUser, AdminUserWithPassword};
pub use session::{
    CurrentAdmin, Flash, FlashLevel, RequestViewState, VolunteerViewState, keys as session_keys,
};
