use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Requester, Reviewer, ServiceRequest, StatusBucket};
use crate::requests::kind::RequestKind;
use crate::types::RequestStatus;

/// Transaction lifecycle of a relational store.
///
/// Every repository call takes the open transaction explicitly, so nothing can
/// touch the store outside a [`UnitOfWork`](super::UnitOfWork). Dropping a
/// transaction without committing discards its changes.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, DatabaseError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), DatabaseError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), DatabaseError>;

    /// Cheap connectivity check for `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Persistence for the six request tables, driven by the kind descriptor.
#[async_trait]
pub trait RequestRepository: Store {
    async fn insert_request(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError>;

    /// Overwrite descriptive fields, attachment references, institution and
    /// `updated_at`. Status and owner are never written here.
    async fn update_request(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError>;

    async fn update_status(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        id: Uuid,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn delete_request(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<(), DatabaseError>;

    async fn find_request(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<Option<ServiceRequest>, DatabaseError>;

    /// Newest first. `owner` restricts to one requester's records.
    async fn list_requests(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        owner: Option<Uuid>,
    ) -> Result<Vec<ServiceRequest>, DatabaseError>;

    /// Row counts grouped by creation month and status
    async fn count_requests(
        &self,
        tx: &mut Self::Tx,
        kind: &RequestKind,
        owner: Option<Uuid>,
        year: Option<i32>,
    ) -> Result<Vec<StatusBucket>, DatabaseError>;

    async fn institution_exists(&self, tx: &mut Self::Tx, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Lookups and credential updates for both principal kinds.
#[async_trait]
pub trait PrincipalRepository: Store {
    async fn find_requester_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<Option<Requester>, DatabaseError>;

    async fn find_requester_by_id(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
    ) -> Result<Option<Requester>, DatabaseError>;

    async fn set_notification_token(
        &self,
        tx: &mut Self::Tx,
        requester_id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError>;

    async fn set_requester_password(
        &self,
        tx: &mut Self::Tx,
        requester_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError>;

    async fn find_reviewer_by_email(
        &self,
        tx: &mut Self::Tx,
        email: &str,
    ) -> Result<Option<Reviewer>, DatabaseError>;

    async fn set_reviewer_password(
        &self,
        tx: &mut Self::Tx,
        reviewer_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError>;
}

/// Everything the HTTP layer needs from a store
pub trait Backend: RequestRepository + PrincipalRepository {}

impl<T: RequestRepository + PrincipalRepository> Backend for T {}
