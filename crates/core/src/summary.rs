//! Dashboard counters.

use serde::Serialize;

use crate::types::{Request, RequestStatus, Volunteer};

/// Headline numbers for the dashboard and its live feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub pending_requests: usize,
    pub assigned_requests: usize,
    pub completed_requests: usize,
    pub verified_volunteers: usize,
    pub volunteers_awaiting_approval: usize,
}

impl DashboardSummary {
    /// Tally a pair of snapshots.
    #[must_use]
    pub fn tally(requests: &[Request], volunteers: &[Volunteer]) -> Self {
        let mut summary = Self::default();
        for request in requests {
            match request.status {
                RequestStatus::Pending => summary.pending_requests += 1,
                RequestStatus::Assigned => summary.assigned_requests += 1,
                RequestStatus::Completed => summary.completed_requests += 1,
            }
        }
        for volunteer in volunteers {
            if volunteer.verified {
                summary.verified_volunteers += 1;
            } else {
                summary.volunteers_awaiting_approval += 1;
            }
        }
        summary
    }

    #[must_use]
    pub const fn total_requests(&self) -> usize {
        self.pending_requests + self.assigned_requests + self.completed_requests
    }
}
