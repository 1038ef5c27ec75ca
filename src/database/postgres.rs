use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    AttachmentRefs, FieldValues, Requester, Reviewer, ServiceRequest, StatusBucket,
};
use crate::database::store::{PrincipalRepository, RequestRepository, Store};
use crate::requests::kind::RequestKind;
use crate::types::RequestStatus;

/// Postgres-backed store. Table and column names come from the static kind
/// descriptors, never from client input, so they are interpolated directly.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type PgTx = Transaction<'static, Postgres>;

fn select_sql(kind: &RequestKind) -> String {
    let columns: Vec<String> = kind.columns().map(|c| format!("r.{}", c)).collect();
    format!(
        "SELECT r.id, {}, r.status, r.user_id, r.instansi_id, r.created_at, r.updated_at, \
         i.nama AS nama_instansi, u.notification_token \
         FROM {} AS r \
         LEFT JOIN instansi AS i ON i.id = r.instansi_id \
         LEFT JOIN users AS u ON u.id = r.user_id",
        columns.join(", "),
        kind.table
    )
}

fn decode_request(kind: &RequestKind, row: &PgRow) -> Result<ServiceRequest, DatabaseError> {
    let mut fields = FieldValues::new();
    for spec in kind.fields {
        let value: Option<String> = row.try_get(spec.name)?;
        fields.insert(spec.name.to_string(), value.unwrap_or_default());
    }

    let mut attachments = AttachmentRefs::new();
    for spec in kind.attachments {
        if let Some(path) = row.try_get::<Option<String>, _>(spec.name)? {
            attachments.insert(spec.name.to_string(), path);
        }
    }

    let status: String = row.try_get("status")?;
    let status = status
        .parse::<RequestStatus>()
        .map_err(|e| DatabaseError::QueryError(format!("{}: {}", kind.table, e)))?;

    Ok(ServiceRequest {
        id: row.try_get("id")?,
        fields,
        attachments,
        status,
        requester_id: row.try_get("user_id")?,
        institution_id: row.try_get("instansi_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        institution_name: row.try_get("nama_instansi")?,
        notification_token: row.try_get("notification_token")?,
    })
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, DatabaseError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), DatabaseError> {
        Ok(tx.commit().await?)
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), DatabaseError> {
        Ok(tx.rollback().await?)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RequestRepository for PgStore {
    async fn insert_request(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError> {
        let columns: Vec<&str> = kind.columns().collect();
        let placeholders: Vec<String> = (0..columns.len() + 5).map(|i| format!("${}", i + 1)).collect();
        let sql = format!(
            "INSERT INTO {} (id, {}, status, user_id, instansi_id, created_at) VALUES ({})",
            kind.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(request.id);
        for spec in kind.fields {
            query = query.bind(request.field(spec.name));
        }
        for spec in kind.attachments {
            query = query.bind(request.attachment(spec.name));
        }
        query
            .bind(request.status.as_str())
            .bind(request.requester_id)
            .bind(request.institution_id)
            .bind(request.created_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn update_request(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError> {
        let assignments: Vec<String> = kind
            .columns()
            .chain(["instansi_id", "updated_at"])
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            kind.table,
            assignments.join(", "),
            assignments.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for spec in kind.fields {
            query = query.bind(request.field(spec.name));
        }
        for spec in kind.attachments {
            query = query.bind(request.attachment(spec.name));
        }
        let result = query
            .bind(request.institution_id)
            .bind(request.updated_at)
            .bind(request.id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {}", kind.table, request.id)));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        id: Uuid,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let sql = format!("UPDATE {} SET status = $1, updated_at = $2 WHERE id = $3", kind.table);
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {}", kind.table, id)));
        }
        Ok(())
    }

    async fn delete_request(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table);
        let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {}", kind.table, id)));
        }
        Ok(())
    }

    async fn find_request(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<Option<ServiceRequest>, DatabaseError> {
        let sql = format!("{} WHERE r.id = $1", select_sql(kind));
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut **tx).await?;
        row.map(|row| decode_request(kind, &row)).transpose()
    }

    async fn list_requests(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        owner: Option<Uuid>,
    ) -> Result<Vec<ServiceRequest>, DatabaseError> {
        let sql = format!(
            "{} WHERE ($1::uuid IS NULL OR r.user_id = $1) ORDER BY r.created_at DESC",
            select_sql(kind)
        );
        let rows = sqlx::query(&sql).bind(owner).fetch_all(&mut **tx).await?;
        rows.iter().map(|row| decode_request(kind, row)).collect()
    }

    async fn count_requests(
        &self,
        tx: &mut PgTx,
        kind: &RequestKind,
        owner: Option<Uuid>,
        year: Option<i32>,
    ) -> Result<Vec<StatusBucket>, DatabaseError> {
        let sql = format!(
            "SELECT EXTRACT(MONTH FROM created_at)::int4 AS month, status, COUNT(*) AS count \
             FROM {} \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::int4 IS NULL OR EXTRACT(YEAR FROM created_at)::int4 = $2) \
             GROUP BY 1, 2",
            kind.table
        );
        let rows = sqlx::query(&sql)
            .bind(owner)
            .bind(year)
            .fetch_all(&mut **tx)
            .await?;

        rows.iter()
            .map(|row| {
                let month: i32 = row.try_get("month")?;
                let status: String = row.try_get("status")?;
                Ok(StatusBucket {
                    month: month as u32,
                    status: status
                        .parse()
                        .map_err(|e| DatabaseError::QueryError(format!("{}: {}", kind.table, e)))?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn institution_exists(&self, tx: &mut PgTx, id: Uuid) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM instansi WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }
}

const REVIEWER_SELECT: &str = "SELECT p.id, p.nama, p.email, p.password, p.role_id, \
     rp.nama AS nama_role, p.created_at \
     FROM pengelola AS p \
     JOIN role_pengelola AS rp ON rp.id = p.role_id";

#[async_trait]
impl PrincipalRepository for PgStore {
    async fn find_requester_by_email(
        &self,
        tx: &mut PgTx,
        email: &str,
    ) -> Result<Option<Requester>, DatabaseError> {
        let requester = sqlx::query_as::<_, Requester>(
            "SELECT id, nama, email, password, notification_token, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(requester)
    }

    async fn find_requester_by_id(
        &self,
        tx: &mut PgTx,
        id: Uuid,
    ) -> Result<Option<Requester>, DatabaseError> {
        let requester = sqlx::query_as::<_, Requester>(
            "SELECT id, nama, email, password, notification_token, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(requester)
    }

    async fn set_notification_token(
        &self,
        tx: &mut PgTx,
        requester_id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET notification_token = $1 WHERE id = $2")
            .bind(token)
            .bind(requester_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("users {}", requester_id)));
        }
        Ok(())
    }

    async fn set_requester_password(
        &self,
        tx: &mut PgTx,
        requester_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(requester_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("users {}", requester_id)));
        }
        Ok(())
    }

    async fn find_reviewer_by_email(
        &self,
        tx: &mut PgTx,
        email: &str,
    ) -> Result<Option<Reviewer>, DatabaseError> {
        let sql = format!("{} WHERE p.email = $1", REVIEWER_SELECT);
        let reviewer = sqlx::query_as::<_, Reviewer>(&sql)
            .bind(email)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(reviewer)
    }

    async fn set_reviewer_password(
        &self,
        tx: &mut PgTx,
        reviewer_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE pengelola SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(reviewer_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("pengelola {}", reviewer_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::kind::{GANGGUAN_JIP, PEMBUATAN_EMAIL};

    #[test]
    fn select_lists_descriptor_columns_and_joins() {
        let sql = select_sql(&PEMBUATAN_EMAIL);
        assert!(sql.starts_with(
            "SELECT r.id, r.nama_lengkap, r.nip, r.jabatan, r.nomor_hp, r.berkas_sk, r.surat_permohonan, r.status"
        ));
        assert!(sql.contains("FROM pembuatan_email AS r"));
        assert!(sql.contains("LEFT JOIN instansi AS i"));
    }

    #[test]
    fn select_includes_detail_only_columns() {
        let sql = select_sql(&GANGGUAN_JIP);
        assert!(sql.contains("r.deskripsi_gangguan"));
        assert!(sql.contains("r.foto"));
    }
}
