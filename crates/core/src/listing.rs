//! Filtering, search, and pagination for dashboard listings.
//!
//! Every listing follows the same pipeline: filter, then search, then cut a
//! page. Ordering is whatever the store returned (insertion order), so none
//! of these functions sort.

use serde::{Deserialize, Serialize};

use crate::types::{Request, RequestStatus, UnknownStatus, Volunteer};

/// Case-insensitive substring match over any of `fields`.
///
/// An empty (or all-whitespace) term matches everything.
#[must_use]
pub fn matches_search<'a>(fields: impl IntoIterator<Item = &'a str>, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    fields
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

// =============================================================================
// Filters
// =============================================================================

/// Request listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RequestStatus),
}

impl StatusFilter {
    /// Whether a request with `status` passes the filter.
    #[must_use]
    pub fn accepts(self, status: RequestStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    /// Query-string value for this filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Only(status) => status.as_str(),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "All" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

/// Volunteer listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerificationFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

impl VerificationFilter {
    /// Whether a volunteer with the given flag passes the filter.
    #[must_use]
    pub const fn accepts(self, verified: bool) -> bool {
        match self {
            Self::All => true,
            Self::Verified => verified,
            Self::Unverified => !verified,
        }
    }

    /// Query-string value for this filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Verified => "Verified",
            Self::Unverified => "Unverified",
        }
    }
}

impl std::str::FromStr for VerificationFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "All" => Ok(Self::All),
            "Verified" => Ok(Self::Verified),
            "Unverified" => Ok(Self::Unverified),
            _ => Err(UnknownStatus {
                kind: "verification filter",
                value: s.to_owned(),
            }),
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Current page of a listing with a fixed page size.
///
/// Pages are 1-based. A request for a page outside `[1, total_pages]` is
/// ignored and the current page stays where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page_size: usize,
    page: usize,
}

impl Pagination {
    /// Start on page 1. A zero page size is treated as 1.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    /// Resume at a previously stored page. The page is clamped on the next
    /// [`Self::clamp`].
    #[must_use]
    pub fn at(page_size: usize, page: usize) -> Self {
        Self {
            page: page.max(1),
            ..Self::new(page_size)
        }
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(total_items / page_size)`. Zero when there is nothing to show.
    #[must_use]
    pub const fn total_pages(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.page_size)
    }

    /// Move to `page` if it exists. Returns whether the page changed hands.
    pub fn go_to(&mut self, page: usize, total_items: usize) -> bool {
        if page < 1 || page > self.total_pages(total_items) {
            return false;
        }
        self.page = page;
        true
    }

    /// Pull the current page back into `[1, max(total_pages, 1)]` after the
    /// filtered set shrank.
    pub fn clamp(&mut self, total_items: usize) {
        let last = self.total_pages(total_items).max(1);
        self.page = self.page.clamp(1, last);
    }

    /// The slice of `items` visible on the current page.
    #[must_use]
    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(items.len());
        items.get(start..end).unwrap_or(&[])
    }
}

/// One rendered page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    /// Items left after filtering and search, across all pages.
    pub total_items: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Run the filter, search, and page pipeline over a request snapshot.
///
/// `requested_page` is applied after the current page is clamped. If it is
/// out of range, `pagination` keeps its previous page.
pub fn list_requests(
    records: &[Request],
    filter: StatusFilter,
    term: &str,
    pagination: &mut Pagination,
    requested_page: Option<usize>,
) -> Page<Request> {
    let matching: Vec<Request> = records
        .iter()
        .filter(|r| filter.accepts(r.status))
        .filter(|r| r.matches_search(term))
        .cloned()
        .collect();
    paginate(matching, pagination, requested_page)
}

/// Run the filter, search, and page pipeline over a volunteer snapshot.
pub fn list_volunteers(
    records: &[Volunteer],
    filter: VerificationFilter,
    term: &str,
    pagination: &mut Pagination,
    requested_page: Option<usize>,
) -> Page<Volunteer> {
    let matching: Vec<Volunteer> = records
        .iter()
        .filter(|v| filter.accepts(v.verified))
        .filter(|v| v.matches_search(term))
        .cloned()
        .collect();
    paginate(matching, pagination, requested_page)
}

fn paginate<T: Clone>(
    matching: Vec<T>,
    pagination: &mut Pagination,
    requested_page: Option<usize>,
) -> Page<T> {
    let total_items = matching.len();
    pagination.clamp(total_items);
    if let Some(page) = requested_page {
        pagination.go_to(page, total_items);
    }

    Page {
        items: pagination.window(&matching).to_vec(),
        page: pagination.page(),
        total_pages: pagination.total_pages(total_items),
        total_items,
    }
}

/// Group `items` by `key`, keeping groups in first-seen order and items in
/// their original order within each group.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<(K, Vec<T>)>
where
    K: PartialEq,
    F: FnMut(&T) -> K,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let k = key(&item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}
