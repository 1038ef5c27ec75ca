use chrono::Utc;
use sqlx::{Executor, PgPool};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::database::manager::DatabaseError;
use crate::database::memory::MemoryStore;
use crate::database::models::{Institution, Requester, Reviewer};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Cannot read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Seed {path} failed: {source}")]
    Statement { path: PathBuf, source: DatabaseError },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

/// Run every `*.sql` file in `dir` in file-name order. Each file is sent as
/// one simple query, so it may hold several statements.
pub async fn run_sql_seeds(pool: &PgPool, dir: &Path) -> Result<Vec<PathBuf>, SeedError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SeedError::Io { path, source }
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort();

    for path in &files {
        let sql = tokio::fs::read_to_string(path).await.map_err(io_err(path))?;
        pool.execute(sql.as_str())
            .await
            .map_err(|e| SeedError::Statement {
                path: path.clone(),
                source: e.into(),
            })?;
        info!("Seeded {}", path.display());
    }
    Ok(files)
}

/// Accounts created for a fresh in-memory store
#[derive(Debug, Clone)]
pub struct DevAccounts {
    pub institution: Institution,
    pub requester: Requester,
    pub reviewer: Reviewer,
}

pub const DEV_REQUESTER_EMAIL: &str = "warga@example.com";
pub const DEV_REVIEWER_EMAIL: &str = "pengelola@example.com";

/// One institution, one requester and one admin reviewer sharing `password`
pub fn seed_memory(store: &MemoryStore, password: &str, bcrypt_cost: u32) -> Result<DevAccounts, SeedError> {
    let now = Utc::now();
    let hashed = hash_password(password, bcrypt_cost)?;

    let institution = Institution {
        id: Uuid::new_v4(),
        nama: "Dinas Komunikasi dan Informatika".to_string(),
        alamat: "Jl. Merdeka No. 1".to_string(),
        keterangan: None,
        created_at: now,
    };
    let requester = Requester {
        id: Uuid::new_v4(),
        nama: "Warga Contoh".to_string(),
        email: DEV_REQUESTER_EMAIL.to_string(),
        password: hashed.clone(),
        notification_token: None,
        created_at: now,
    };
    let reviewer = Reviewer {
        id: Uuid::new_v4(),
        nama: "Pengelola Aptika".to_string(),
        email: DEV_REVIEWER_EMAIL.to_string(),
        password: hashed,
        role_id: Uuid::new_v4(),
        nama_role: "admin".to_string(),
        created_at: now,
    };

    store.insert_institution(institution.clone());
    store.insert_requester(requester.clone())?;
    store.insert_reviewer(reviewer.clone())?;
    info!(
        "Seeded in-memory store: institution {}, requester {}, reviewer {}",
        institution.id, requester.email, reviewer.email
    );

    Ok(DevAccounts {
        institution,
        requester,
        reviewer,
    })
}
