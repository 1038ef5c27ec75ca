use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Citizen account (table `users`)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Requester {
    pub id: Uuid,
    pub nama: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub notification_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Department staff account (table `pengelola`), joined with its role name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reviewer {
    pub id: Uuid,
    pub nama: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role_id: Uuid,
    pub nama_role: String,
    pub created_at: DateTime<Utc>,
}
