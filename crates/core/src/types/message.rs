//! Message board records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AssignmentId, MessageId, RequestId, VolunteerId};
use super::status::RequestStatus;

/// One message in a volunteer's thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub volunteer_id: VolunteerId,
    /// Display name of the sender.
    pub name: String,
    pub details: String,
    /// Missing on messages written before timestamps were recorded.
    pub sent_at: Option<DateTime<Utc>>,
}

/// Audit entry written alongside every successful assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub request_id: RequestId,
    pub volunteer_id: VolunteerId,
    pub assigned_at: DateTime<Utc>,
    /// Email of the admin who made the assignment.
    pub assigned_by: String,
    /// Request status the assignment produced. Always `Assigned` today.
    pub status: RequestStatus,
}
