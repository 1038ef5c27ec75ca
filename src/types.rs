/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which identity system a caller authenticated against.
/// Resolved once when a token is verified and carried explicitly afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Requester,
    Reviewer,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Requester => "requester",
            PrincipalKind::Reviewer => "reviewer",
        }
    }
}

/// Lifecycle status shared by every request kind.
/// Wire values are the Indonesian literals the mobile and web clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "diproses")]
    Pending,
    #[serde(rename = "disetujui")]
    Approved,
    #[serde(rename = "ditolak")]
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "diproses",
            RequestStatus::Approved => "disetujui",
            RequestStatus::Rejected => "ditolak",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diproses" => Ok(RequestStatus::Pending),
            "disetujui" => Ok(RequestStatus::Approved),
            "ditolak" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Storage category of an attachment. Each category has its own directory
/// and its own MIME allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentCategory {
    Document,
    Image,
}

impl AttachmentCategory {
    /// Directory name under the upload root, also used in public URLs.
    pub fn dir_name(&self) -> &'static str {
        match self {
            AttachmentCategory::Document => "docs",
            AttachmentCategory::Image => "img",
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            AttachmentCategory::Document => &["application/pdf"],
            AttachmentCategory::Image => &["image/png", "image/jpeg", "image/jpg"],
        }
    }
}
