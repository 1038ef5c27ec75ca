//! Fixtures shared by the unit tests

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::{SecurityConfig, StorageConfig};
use crate::database::models::{FieldValues, Institution, Requester, Reviewer, ServiceRequest};
use crate::database::MemoryStore;
use crate::notification::{NotificationError, Notifier, PushMessage};
use crate::requests::kind::{RequestKind, INSTITUTION_FIELD};
use crate::requests::validation::Rule;
use crate::types::RequestStatus;

pub const TEST_PASSWORD: &str = "rahasia123";

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff";

pub fn security_config() -> SecurityConfig {
    SecurityConfig {
        requester_jwt_secret: "test-requester-secret".to_string(),
        reviewer_jwt_secret: "test-reviewer-secret".to_string(),
        jwt_expiry_minutes: 60,
        bcrypt_cost: 4,
        cors_origins: vec![],
    }
}

pub fn storage_config(upload_dir: impl Into<PathBuf>) -> StorageConfig {
    StorageConfig {
        upload_dir: upload_dir.into(),
        host_origin: "http://localhost:8080".to_string(),
        requester_docs_prefix: "api/v1/uploads/user/docs/".to_string(),
        requester_img_prefix: "api/v1/uploads/user/img/".to_string(),
        reviewer_docs_prefix: "api/v1/uploads/pengelola/docs/".to_string(),
        reviewer_img_prefix: "api/v1/uploads/pengelola/img/".to_string(),
    }
}

pub async fn seed_requester(store: &MemoryStore, email: &str) -> Requester {
    let requester = Requester {
        id: Uuid::new_v4(),
        nama: "Warga Uji".to_string(),
        email: email.to_string(),
        password: hash_password(TEST_PASSWORD, 4).unwrap(),
        notification_token: None,
        created_at: Utc::now(),
    };
    store.insert_requester(requester.clone()).unwrap();
    requester
}

pub fn seed_reviewer(store: &MemoryStore, email: &str) -> Reviewer {
    let reviewer = Reviewer {
        id: Uuid::new_v4(),
        nama: "Pengelola Uji".to_string(),
        email: email.to_string(),
        password: hash_password(TEST_PASSWORD, 4).unwrap(),
        role_id: Uuid::new_v4(),
        nama_role: "admin".to_string(),
        created_at: Utc::now(),
    };
    store.insert_reviewer(reviewer.clone()).unwrap();
    reviewer
}

pub fn seed_institution(store: &MemoryStore) -> Institution {
    let institution = Institution {
        id: Uuid::new_v4(),
        nama: "Dinas Komunikasi dan Informatika".to_string(),
        alamat: "Jl. Merdeka No. 1".to_string(),
        keterangan: None,
        created_at: Utc::now(),
    };
    store.insert_institution(institution.clone());
    institution
}

/// A value that passes `rules`
fn sample_value(rules: &[Rule]) -> String {
    if rules.contains(&Rule::Ip) {
        "10.20.30.40".to_string()
    } else if rules.contains(&Rule::Email) {
        "diskominfo@kab.go.id".to_string()
    } else if rules.contains(&Rule::MinLen(18)) {
        "199001012015031001".to_string()
    } else if rules.contains(&Rule::Numeric) {
        "081234567890".to_string()
    } else {
        "Contoh isian".to_string()
    }
}

/// Descriptive fields plus `instansi_id`, all valid for `kind`
pub fn valid_fields(kind: &RequestKind, institution_id: Uuid) -> FieldValues {
    let mut fields: FieldValues = kind
        .fields
        .iter()
        .map(|spec| (spec.name.to_string(), sample_value(spec.rules)))
        .collect();
    fields.insert(INSTITUTION_FIELD.to_string(), institution_id.to_string());
    fields
}

pub fn sample_request(kind: &RequestKind, requester_id: Uuid, institution_id: Uuid) -> ServiceRequest {
    let mut fields = valid_fields(kind, institution_id);
    fields.remove(INSTITUTION_FIELD);
    ServiceRequest {
        id: Uuid::new_v4(),
        fields,
        attachments: Default::default(),
        status: RequestStatus::Pending,
        requester_id,
        institution_id,
        created_at: Utc::now(),
        updated_at: None,
        institution_name: None,
        notification_token: None,
    }
}

/// Notifier double that records every attempt
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<PushMessage>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Record attempts but report every one as failed
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(())
    }
}
