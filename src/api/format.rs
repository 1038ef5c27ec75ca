use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::StorageConfig;
use crate::database::models::ServiceRequest;
use crate::requests::kind::{RequestKind, INSTITUTION_FIELD};
use crate::types::{AttachmentCategory, PrincipalKind};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Public base URLs of the four static download routes.
///
/// The same stored file is reachable under a requester prefix and a reviewer
/// prefix; which one a response uses depends only on the caller's kind.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    requester_docs: String,
    requester_img: String,
    reviewer_docs: String,
    reviewer_img: String,
}

fn join_base(origin: &str, prefix: &str) -> String {
    if prefix.starts_with("http://") || prefix.starts_with("https://") {
        return prefix.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        prefix.trim_start_matches('/')
    )
}

impl PublicUrls {
    pub fn from_config(storage: &StorageConfig) -> Self {
        let origin = storage.host_origin.as_str();
        Self {
            requester_docs: join_base(origin, &storage.requester_docs_prefix),
            requester_img: join_base(origin, &storage.requester_img_prefix),
            reviewer_docs: join_base(origin, &storage.reviewer_docs_prefix),
            reviewer_img: join_base(origin, &storage.reviewer_img_prefix),
        }
    }

    pub fn base(&self, category: AttachmentCategory, caller: PrincipalKind) -> &str {
        match (caller, category) {
            (PrincipalKind::Requester, AttachmentCategory::Document) => &self.requester_docs,
            (PrincipalKind::Requester, AttachmentCategory::Image) => &self.requester_img,
            (PrincipalKind::Reviewer, AttachmentCategory::Document) => &self.reviewer_docs,
            (PrincipalKind::Reviewer, AttachmentCategory::Image) => &self.reviewer_img,
        }
    }

    /// Absolute URL of a stored file as seen by `caller`; `None` when the slot is empty
    pub fn attachment_url(
        &self,
        stored_name: Option<&str>,
        category: AttachmentCategory,
        caller: PrincipalKind,
    ) -> Option<String> {
        stored_name
            .filter(|name| !name.is_empty())
            .map(|name| format!("{}{}", self.base(category, caller), name))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn shape(
    kind: &RequestKind,
    request: &ServiceRequest,
    urls: &PublicUrls,
    caller: PrincipalKind,
    detail: bool,
) -> Value {
    let mut obj = Map::new();
    obj.insert("id".into(), Value::String(request.id.to_string()));

    for spec in kind.fields.iter().filter(|f| detail || f.in_summary) {
        obj.insert(spec.name.into(), Value::String(request.field(spec.name).to_string()));
    }
    for spec in kind.attachments.iter().filter(|a| detail || a.in_summary) {
        let url = urls.attachment_url(request.attachment(spec.name), spec.category, caller);
        obj.insert(spec.name.into(), url.map(Value::String).unwrap_or(Value::Null));
    }

    obj.insert(
        INSTITUTION_FIELD.into(),
        Value::String(request.institution_id.to_string()),
    );
    obj.insert(
        "nama_instansi".into(),
        request
            .institution_name
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    obj.insert("status".into(), Value::String(request.status.as_str().into()));
    obj.insert("created_at".into(), Value::String(format_timestamp(&request.created_at)));
    if detail {
        obj.insert(
            "updated_at".into(),
            request
                .updated_at
                .as_ref()
                .map(|ts| Value::String(format_timestamp(ts)))
                .unwrap_or(Value::Null),
        );
    }

    Value::Object(obj)
}

/// List entry: summary fields only
pub fn summary_view(
    kind: &RequestKind,
    request: &ServiceRequest,
    urls: &PublicUrls,
    caller: PrincipalKind,
) -> Value {
    shape(kind, request, urls, caller, false)
}

/// Single record: every field and attachment plus `updated_at`
pub fn detail_view(
    kind: &RequestKind,
    request: &ServiceRequest,
    urls: &PublicUrls,
    caller: PrincipalKind,
) -> Value {
    shape(kind, request, urls, caller, true)
}

/// Totals for one group of requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub diproses: i64,
    pub disetujui: i64,
    pub ditolak: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCounts {
    /// `YYYY-MM`
    pub bulan: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}
