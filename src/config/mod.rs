use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL, or `memory:` for the in-process store
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub requester_jwt_secret: String,
    pub reviewer_jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Scheme, host and port the public URLs are rooted at, e.g. `http://localhost:8080`
    pub host_origin: String,
    pub requester_docs_prefix: String,
    pub requester_img_prefix: String,
    pub reviewer_docs_prefix: String,
    pub reviewer_img_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = v;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_MAX_LIFETIME_SECS") {
            self.database.max_lifetime_secs = v.parse().unwrap_or(self.database.max_lifetime_secs);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT_SECS") {
            self.database.idle_timeout_secs = v.parse().unwrap_or(self.database.idle_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.requester_jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_PENGELOLA_SECRET") {
            self.security.reviewer_jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_MINUTES") {
            self.security.jwt_expiry_minutes = v.parse().unwrap_or(self.security.jwt_expiry_minutes);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Storage overrides
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("HOST_ORIGIN") {
            self.storage.host_origin = v;
        }
        if let Ok(v) = env::var("STATIC_DOCS_ORIGIN_USER") {
            self.storage.requester_docs_prefix = v;
        }
        if let Ok(v) = env::var("STATIC_IMG_ORIGIN_USER") {
            self.storage.requester_img_prefix = v;
        }
        if let Ok(v) = env::var("STATIC_DOCS_ORIGIN_PENGELOLA") {
            self.storage.reviewer_docs_prefix = v;
        }
        if let Ok(v) = env::var("STATIC_IMG_ORIGIN_PENGELOLA") {
            self.storage.reviewer_img_prefix = v;
        }

        // Notification overrides
        if let Ok(v) = env::var("NOTIFICATION_ENABLED") {
            self.notification.enabled = v.parse().unwrap_or(self.notification.enabled);
        }
        if let Ok(v) = env::var("NOTIFICATION_ENDPOINT") {
            self.notification.endpoint = v;
        }
        if let Ok(v) = env::var("NOTIFICATION_TIMEOUT_SECS") {
            self.notification.timeout_secs = v.parse().unwrap_or(self.notification.timeout_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: "memory:".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 30,
                max_lifetime_secs: 60 * 60,
                idle_timeout_secs: 10 * 60,
                run_migrations: true,
            },
            security: SecurityConfig {
                requester_jwt_secret: "dev-requester-secret".to_string(),
                reviewer_jwt_secret: "dev-reviewer-secret".to_string(),
                jwt_expiry_minutes: 60,
                bcrypt_cost: 10,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            storage: StorageConfig::defaults("http://localhost:8080"),
            notification: NotificationConfig {
                enabled: false,
                endpoint: NotificationConfig::EXPO_ENDPOINT.to_string(),
                timeout_secs: 5,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8080,
                max_request_size_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                min_connections: 5,
                acquire_timeout_secs: 10,
                max_lifetime_secs: 60 * 60,
                idle_timeout_secs: 10 * 60,
                run_migrations: true,
            },
            security: SecurityConfig {
                requester_jwt_secret: String::new(),
                reviewer_jwt_secret: String::new(),
                jwt_expiry_minutes: 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            storage: StorageConfig::defaults("https://staging.example.com"),
            notification: NotificationConfig {
                enabled: true,
                endpoint: NotificationConfig::EXPO_ENDPOINT.to_string(),
                timeout_secs: 5,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                min_connections: 5,
                acquire_timeout_secs: 5,
                max_lifetime_secs: 60 * 60,
                idle_timeout_secs: 10 * 60,
                run_migrations: false,
            },
            security: SecurityConfig {
                requester_jwt_secret: String::new(),
                reviewer_jwt_secret: String::new(),
                jwt_expiry_minutes: 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            storage: StorageConfig::defaults("https://app.example.com"),
            notification: NotificationConfig {
                enabled: true,
                endpoint: NotificationConfig::EXPO_ENDPOINT.to_string(),
                timeout_secs: 3,
            },
        }
    }
}

impl StorageConfig {
    fn defaults(host_origin: &str) -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            host_origin: host_origin.to_string(),
            requester_docs_prefix: "api/v1/uploads/user/docs/".to_string(),
            requester_img_prefix: "api/v1/uploads/user/img/".to_string(),
            reviewer_docs_prefix: "api/v1/uploads/pengelola/docs/".to_string(),
            reviewer_img_prefix: "api/v1/uploads/pengelola/img/".to_string(),
        }
    }
}

impl NotificationConfig {
    pub const EXPO_ENDPOINT: &'static str = "https://exp.host/--/api/v2/push/send";
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
