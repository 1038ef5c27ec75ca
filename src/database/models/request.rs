use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::RequestStatus;

/// Kind-specific descriptive columns, keyed by column name
pub type FieldValues = BTreeMap<String, String>;

/// Attachment slot name to relative storage path (file name only)
pub type AttachmentRefs = BTreeMap<String, String>;

/// One row of any of the six request tables.
/// The owning kind is implied by the table it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub fields: FieldValues,
    pub attachments: AttachmentRefs,
    pub status: RequestStatus,
    pub requester_id: Uuid,
    pub institution_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Joined from `instansi.nama`; not stored on the row
    pub institution_name: Option<String>,
    /// Joined from the owner's `users.notification_token`; not stored on the row
    pub notification_token: Option<String>,
}

impl ServiceRequest {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn attachment(&self, slot: &str) -> Option<&str> {
        self.attachments
            .get(slot)
            .map(String::as_str)
            .filter(|path| !path.is_empty())
    }

    pub fn is_owned_by(&self, requester_id: Uuid) -> bool {
        self.requester_id == requester_id
    }
}

/// Row count for one (month, status) pair, produced by the counting queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBucket {
    /// Calendar month 1..=12 of `created_at`
    pub month: u32,
    pub status: RequestStatus,
    pub count: i64,
}
