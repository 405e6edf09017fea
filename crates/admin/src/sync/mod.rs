//! Live local views of store collections.
//!
//! - [`projection`] - Generic snapshot-driven projection
//! - [`directory`] - Volunteers, with approval and removal
//! - [`queue`] - Requests, with the listing pipeline

pub mod directory;
pub mod projection;
pub mod queue;

pub use directory::VolunteerDirectory;
pub use projection::{Keyed, Projection, ProjectionState};
pub use queue::RequestQueue;
