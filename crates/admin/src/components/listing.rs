//! Listing component types.
//!
//! One configurable listing renders requests, volunteers, and the approval
//! queue. A [`ViewConfig`] picks the columns, the filter options, how rows
//! are grouped, whether they show as cards or a table, and which row actions
//! appear. Records are turned into display rows through [`ListingItem`].

use serde::{Deserialize, Serialize};

use carelink_core::listing::group_by;
use carelink_core::{Request, RequestStatus, Volunteer};

/// Cards or rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Grid,
    Table,
}

impl DisplayMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Table => "table",
        }
    }

    #[must_use]
    pub const fn is_table(self) -> bool {
        matches!(self, Self::Table)
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "table" => Ok(Self::Table),
            _ => Err(format!("invalid display mode: {s}")),
        }
    }
}

/// Column definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingColumn {
    /// Key passed to [`ListingItem::cell`].
    pub key: String,
    /// Display label for the column header.
    pub label: String,
}

impl ListingColumn {
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

/// Option in the filter dropdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    /// Query-string value.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl FilterOption {
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Per-row buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    /// Link to the detail page (where requests get volunteers assigned).
    View,
    /// Verify a volunteer.
    Approve,
    /// Delete a volunteer.
    Remove,
    /// Delete a request.
    Delete,
}

impl RowAction {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "View & assign",
            Self::Approve => "Approve",
            Self::Remove => "Remove",
            Self::Delete => "Delete",
        }
    }

    /// Whether the action is a `POST` form rather than a link.
    #[must_use]
    pub const fn is_form(self) -> bool {
        !matches!(self, Self::View)
    }

    /// Whether the action destroys data (rendered in red, asks to confirm).
    #[must_use]
    pub const fn is_destructive(self) -> bool {
        matches!(self, Self::Remove | Self::Delete)
    }

    /// Target URL for `id` under `base_path`.
    #[must_use]
    pub fn path(self, base_path: &str, id: &str) -> String {
        match self {
            Self::View => format!("{base_path}/{id}"),
            Self::Approve => format!("{base_path}/{id}/approve"),
            Self::Remove => format!("{base_path}/{id}/remove"),
            Self::Delete => format!("{base_path}/{id}/delete"),
        }
    }
}

/// Field rows are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Nothing,
    Status,
    Location,
}

impl GroupBy {
    /// Column key whose value names the group.
    #[must_use]
    pub const fn key(self) -> Option<&'static str> {
        match self {
            Self::Nothing => None,
            Self::Status => Some("status"),
            Self::Location => Some("location"),
        }
    }
}

/// Listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Heading shown above the listing.
    pub title: String,
    /// Path listing links and row actions hang off.
    pub base_path: String,
    pub columns: Vec<ListingColumn>,
    /// Query parameter the filter dropdown submits as.
    pub filter_param: String,
    /// Dropdown options. Empty hides the filter.
    pub filter_options: Vec<FilterOption>,
    pub group_by: GroupBy,
    pub display_mode: DisplayMode,
    pub actions: Vec<RowAction>,
    pub search_placeholder: String,
    pub empty_title: String,
}

impl ViewConfig {
    #[must_use]
    pub fn new(title: &str, base_path: &str) -> Self {
        Self {
            title: title.to_string(),
            base_path: base_path.to_string(),
            columns: Vec::new(),
            filter_param: "filter".to_string(),
            filter_options: Vec::new(),
            group_by: GroupBy::Nothing,
            display_mode: DisplayMode::Grid,
            actions: Vec::new(),
            search_placeholder: "Search...".to_string(),
            empty_title: "Nothing here yet".to_string(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: ListingColumn) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn filter_param(mut self, param: &str) -> Self {
        self.filter_param = param.to_string();
        self
    }

    #[must_use]
    pub fn filter_option(mut self, option: FilterOption) -> Self {
        self.filter_options.push(option);
        self
    }

    #[must_use]
    pub const fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = group_by;
        self
    }

    #[must_use]
    pub const fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    #[must_use]
    pub fn action(mut self, action: RowAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    #[must_use]
    pub fn empty_title(mut self, title: &str) -> Self {
        self.empty_title = title.to_string();
        self
    }

    /// Turn records into display rows, grouped per [`Self::group_by`].
    ///
    /// No items means no groups.
    #[must_use]
    pub fn groups<T: ListingItem>(&self, items: &[T]) -> Vec<ListingGroup> {
        if items.is_empty() {
            return Vec::new();
        }
        let rows = items.iter().map(|item| ListingRow::build(item, self));
        match self.group_by.key() {
            None => vec![ListingGroup {
                label: String::new(),
                rows: rows.collect(),
            }],
            Some(key) => group_by(rows, |row| row.group_value(key))
                .into_iter()
                .map(|(label, rows)| ListingGroup { label, rows })
                .collect(),
        }
    }
}

/// Something a listing can show.
pub trait ListingItem {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    /// Short status label and its CSS tone.
    fn badge(&self) -> (String, &'static str);
    /// Display value for a column key. Unknown keys render empty.
    fn cell(&self, key: &str) -> String;
}

impl ListingItem for Request {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn badge(&self) -> (String, &'static str) {
        let tone = match self.status {
            RequestStatus::Pending => "warning",
            RequestStatus::Assigned => "info",
            RequestStatus::Completed => "success",
        };
        (self.status.to_string(), tone)
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            "address" => self.address.clone(),
            "details" => self.details.clone(),
            "status" => self.status.to_string(),
            "volunteers" => self.assigned_volunteers.len().to_string(),
            _ => String::new(),
        }
    }
}

impl ListingItem for Volunteer {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn badge(&self) -> (String, &'static str) {
        if self.verified {
            ("Verified".to_string(), "success")
        } else {
            ("Awaiting approval".to_string(), "warning")
        }
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            "location" => self.location.clone(),
            "status" => self.status.to_string(),
            "requests" => self.requested_users.len().to_string(),
            _ => String::new(),
        }
    }
}

/// One rendered record.
#[derive(Debug, Clone, Serialize)]
pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub badge: String,
    pub badge_tone: &'static str,
    /// `(label, value)` per configured column.
    pub cells: Vec<(String, String)>,
    pub actions: Vec<ActionLink>,
    group_values: Vec<(String, String)>,
}

/// A row action resolved against one record.
#[derive(Debug, Clone, Serialize)]
pub struct ActionLink {
    pub label: &'static str,
    pub href: String,
    pub is_form: bool,
    pub is_destructive: bool,
}

impl ListingRow {
    fn build<T: ListingItem>(item: &T, config: &ViewConfig) -> Self {
        let (badge, badge_tone) = item.badge();
        let group_values = config
            .group_by
            .key()
            .map(|key| vec![(key.to_string(), item.cell(key))])
            .unwrap_or_default();
        Self {
            id: item.id().to_string(),
            title: item.title().to_string(),
            badge,
            badge_tone,
            cells: config
                .columns
                .iter()
                .map(|c| (c.label.clone(), item.cell(&c.key)))
                .collect(),
            actions: config
                .actions
                .iter()
                .map(|&action| ActionLink {
                    label: action.label(),
                    href: action.path(&config.base_path, item.id()),
                    is_form: action.is_form(),
                    is_destructive: action.is_destructive(),
                })
                .collect(),
            group_values,
        }
    }

    fn group_value(&self, key: &str) -> String {
        self.group_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| if v.is_empty() { "Unspecified".to_string() } else { v.clone() })
            .unwrap_or_default()
    }
}

/// Rows sharing a group value. `label` is empty when grouping is off.
#[derive(Debug, Clone, Serialize)]
pub struct ListingGroup {
    pub label: String,
    pub rows: Vec<ListingRow>,
}

// =============================================================================
// Listing presets
// =============================================================================

/// Request queue listing.
#[must_use]
pub fn requests_view() -> ViewConfig {
    let mut config = ViewConfig::new("Requests", "/requests")
        .column(ListingColumn::new("email", "Email"))
        .column(ListingColumn::new("phone", "Phone"))
        .column(ListingColumn::new("address", "Address"))
        .column(ListingColumn::new("details", "Details"))
        .column(ListingColumn::new("volunteers", "Volunteers"))
        .filter_param("status")
        .filter_option(FilterOption::new("All", "All requests"));
    for status in RequestStatus::ALL {
        config = config.filter_option(FilterOption::new(status.as_str(), status.as_str()));
    }
    config
        .action(RowAction::View)
        .action(RowAction::Delete)
        .search_placeholder("Search by name...")
        .empty_title("No requests match")
}

/// Volunteer roster listing.
#[must_use]
pub fn volunteers_view() -> ViewConfig {
    ViewConfig::new("Volunteers", "/volunteers")
        .column(ListingColumn::new("email", "Email"))
        .column(ListingColumn::new("phone", "Phone"))
        .column(ListingColumn::new("location", "Location"))
        .column(ListingColumn::new("requests", "Requests"))
        .filter_option(FilterOption::new("All", "All volunteers"))
        .filter_option(FilterOption::new("Verified", "Verified"))
        .filter_option(FilterOption::new("Unverified", "Unverified"))
        .action(RowAction::Remove)
        .search_placeholder("Search by name or email...")
        .empty_title("No volunteers match")
}

/// Registrations awaiting approval, grouped by location.
#[must_use]
pub fn pending_volunteers_view() -> ViewConfig {
    ViewConfig::new("Pending approval", "/volunteers")
        .column(ListingColumn::new("email", "Email"))
        .column(ListingColumn::new("phone", "Phone"))
        .group_by(GroupBy::Location)
        .action(RowAction::Approve)
        .action(RowAction::Remove)
        .empty_title("No registrations waiting")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use carelink_core::{VolunteerId, VolunteerStatus};

    fn volunteer(id: &str, location: &str) -> Volunteer {
        Volunteer {
            id: VolunteerId::new(id),
            name: format!("Vol {id}"),
            email: format!("{id}@example.org"),
            phone: String::new(),
            location: location.to_string(),
            verified: false,
            requested_users: Vec::new(),
            status: VolunteerStatus::Available,
        }
    }

    #[test]
    fn test_row_actions_build_paths() {
        assert_eq!(RowAction::View.path("/requests", "r1"), "/requests/r1");
        assert_eq!(
            RowAction::Approve.path("/volunteers", "v1"),
            "/volunteers/v1/approve"
        );
        assert!(RowAction::Delete.is_destructive());
        assert!(!RowAction::View.is_form());
    }

    #[test]
    fn test_ungrouped_listing_is_one_group() {
        let groups = volunteers_view().groups(&[volunteer("a", "North"), volunteer("b", "")]);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].label.is_empty());
        assert_eq!(groups[0].rows[0].cells[0], ("Email".to_string(), "a@example.org".to_string()));
        assert_eq!(groups[0].rows[1].actions[0].href, "/volunteers/b/remove");
    }

    #[test]
    fn test_empty_listing_has_no_groups() {
        assert!(volunteers_view().groups::<Volunteer>(&[]).is_empty());
        assert!(pending_volunteers_view().groups::<Volunteer>(&[]).is_empty());
    }

    #[test]
    fn test_grouping_by_location_keeps_order() {
        let items = [
            volunteer("a", "North"),
            volunteer("b", ""),
            volunteer("c", "North"),
        ];
        let groups = pending_volunteers_view().groups(&items);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["North", "Unspecified"]);
        assert_eq!(groups[0].rows.len(), 2);
    }

    #[test]
    fn test_display_mode_parses_query_value() {
        assert_eq!("table".parse::<DisplayMode>().unwrap(), DisplayMode::Table);
        assert!("list".parse::<DisplayMode>().is_err());
    }
}
