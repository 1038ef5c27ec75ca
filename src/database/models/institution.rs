use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organisation a request is filed on behalf of (table `instansi`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: Uuid,
    pub nama: String,
    pub alamat: String,
    pub keterangan: Option<String>,
    pub created_at: DateTime<Utc>,
}
