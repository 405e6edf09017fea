//! Core types for CareLink.
//!
//! Records mirror the documents in each store collection. Identifiers and
//! statuses get their own types so they can't be mixed up.

pub mod email;
pub mod id;
pub mod message;
pub mod request;
pub mod status;
pub mod volunteer;

pub use email::{Email, EmailError};
pub use id::*;
pub use message::{AssignmentRecord, Message};
pub use request::{Request, TransitionError};
pub use status::*;
pub use volunteer::Volunteer;
