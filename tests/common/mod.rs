#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

use layanan_aptika::auth::password::hash_password;
use layanan_aptika::config::{
    AppConfig, DatabaseConfig, Environment, NotificationConfig, SecurityConfig, ServerConfig,
    StorageConfig,
};
use layanan_aptika::database::models::Requester;
use layanan_aptika::database::seed::{seed_memory, DevAccounts, DEV_REQUESTER_EMAIL, DEV_REVIEWER_EMAIL};
use layanan_aptika::database::MemoryStore;
use layanan_aptika::notification::{NotificationError, Notifier, PushMessage};
use layanan_aptika::requests::validation::Rule;
use layanan_aptika::requests::{find_by_slug, RequestKind};
use layanan_aptika::{app, AppState};

pub const PASSWORD: &str = "rahasia123";

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff";

/// Records push messages instead of sending them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &PushMessage) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// One server per test, bound to a free port, backed by the in-memory store
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: MemoryStore,
    pub accounts: DevAccounts,
    pub notifier: Arc<RecordingNotifier>,
    pub upload_dir: TempDir,
}

fn config(port: u16, upload_dir: &TempDir) -> AppConfig {
    let origin = format!("http://127.0.0.1:{}", port);
    AppConfig {
        environment: Environment::Development,
        server: ServerConfig {
            port,
            max_request_size_bytes: 64 * 1024,
        },
        database: DatabaseConfig {
            url: "memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 1,
            max_lifetime_secs: 60,
            idle_timeout_secs: 60,
            run_migrations: false,
        },
        security: SecurityConfig {
            requester_jwt_secret: "it-requester-secret".to_string(),
            reviewer_jwt_secret: "it-reviewer-secret".to_string(),
            jwt_expiry_minutes: 60,
            bcrypt_cost: 4,
            cors_origins: vec![],
        },
        storage: StorageConfig {
            upload_dir: upload_dir.path().to_path_buf(),
            host_origin: origin,
            requester_docs_prefix: "api/v1/uploads/user/docs/".to_string(),
            requester_img_prefix: "api/v1/uploads/user/img/".to_string(),
            reviewer_docs_prefix: "api/v1/uploads/pengelola/docs/".to_string(),
            reviewer_img_prefix: "api/v1/uploads/pengelola/img/".to_string(),
        },
        notification: NotificationConfig {
            enabled: false,
            endpoint: NotificationConfig::EXPO_ENDPOINT.to_string(),
            timeout_secs: 1,
        },
    }
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let upload_dir = tempfile::tempdir()?;
        let config = config(port, &upload_dir);

        let store = MemoryStore::new();
        let accounts = seed_memory(&store, PASSWORD, 4)?;
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(store.clone(), &config, notifier.clone())?;
        let router = app(state, &config);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            store,
            accounts,
            notifier,
            upload_dir,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub fn institution_id(&self) -> Uuid {
        self.accounts.institution.id
    }

    /// Add another requester account with the shared password
    pub fn add_requester(&self, email: &str) -> Result<Requester> {
        let requester = Requester {
            id: Uuid::new_v4(),
            nama: "Warga Lain".to_string(),
            email: email.to_string(),
            password: hash_password(PASSWORD, 4)?,
            notification_token: None,
            created_at: Utc::now(),
        };
        self.store.insert_requester(requester.clone())?;
        Ok(requester)
    }

    pub async fn login_as(&self, path: &str, body: Value) -> Result<String> {
        let res = self.client.post(self.api(path)).json(&body).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["access_token"]
            .as_str()
            .map(str::to_string)
            .context("login response without access_token")
    }

    pub async fn requester_token(&self) -> Result<String> {
        self.login_as(
            "/login/user",
            json!({ "email": DEV_REQUESTER_EMAIL, "password": PASSWORD }),
        )
        .await
    }

    pub async fn reviewer_token(&self) -> Result<String> {
        self.login_as(
            "/login/pengelola",
            json!({ "email": DEV_REVIEWER_EMAIL, "password": PASSWORD }),
        )
        .await
    }

    pub async fn create(&self, token: &str, slug: &str, form: Form) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.api(&format!("/{}", slug)))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn get_json(&self, token: &str, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.api(path)).bearer_auth(token).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn set_status(&self, token: &str, slug: &str, id: &str, status: &str) -> Result<StatusCode> {
        let res = self
            .client
            .patch(self.api(&format!("/{}/{}", slug, id)))
            .bearer_auth(token)
            .json(&json!({ "status": status }))
            .send()
            .await?;
        Ok(res.status())
    }
}

pub fn kind(slug: &str) -> &'static RequestKind {
    find_by_slug(slug).expect("known request kind")
}

fn sample_value(rules: &[Rule]) -> String {
    if rules.contains(&Rule::Ip) {
        "10.20.30.40".to_string()
    } else if rules.contains(&Rule::Email) {
        "diskominfo@kab.go.id".to_string()
    } else if rules.contains(&Rule::MinLen(18)) {
        "123456789012345678".to_string()
    } else if rules.contains(&Rule::Numeric) {
        "081234567890".to_string()
    } else {
        "Contoh isian".to_string()
    }
}

/// A multipart form with every text field valid for `slug`, no files
pub fn valid_form(slug: &str, institution_id: Uuid) -> Form {
    kind(slug)
        .fields
        .iter()
        .fold(Form::new(), |form, spec| form.text(spec.name, sample_value(spec.rules)))
        .text("instansi_id", institution_id.to_string())
}

pub fn file_part(bytes: &'static [u8], filename: &str) -> Part {
    Part::bytes(bytes).file_name(filename.to_string())
}
