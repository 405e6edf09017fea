//! Reusable view components.
//!
//! - `listing` - Filterable, searchable, paginated grid/table listings

pub mod listing;

pub use listing::{
    ActionLink, DisplayMode, GroupBy, ListingGroup, ListingItem, ListingRow, RowAction, ViewConfig,
};
