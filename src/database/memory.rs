use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Institution, Requester, Reviewer, ServiceRequest, StatusBucket};
use crate::database::store::{PrincipalRepository, RequestRepository, Store};
use crate::requests::kind::RequestKind;
use crate::types::RequestStatus;

#[derive(Debug, Clone, Default)]
struct State {
    institutions: HashMap<Uuid, Institution>,
    requesters: HashMap<Uuid, Requester>,
    reviewers: HashMap<Uuid, Reviewer>,
    /// Keyed by (table, id); joined columns are always `None` here
    requests: HashMap<(&'static str, Uuid), ServiceRequest>,
}

/// A row written inside a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Requester(Uuid),
    Reviewer(Uuid),
    Request(&'static str, Uuid),
}

/// Transaction over [`MemoryStore`]: a snapshot taken at `begin` plus the set
/// of rows it wrote. Commit copies only the written rows back, so two
/// transactions touching the same row resolve as last-commit-wins.
pub struct MemoryTx {
    staged: State,
    writes: Vec<RowKey>,
}

impl MemoryTx {
    fn touch(&mut self, key: RowKey) {
        if !self.writes.contains(&key) {
            self.writes.push(key);
        }
    }
}

/// In-process store selected by `DATABASE_URL=memory:`
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_next_commit: Arc<AtomicBool>,
    stall_next_begin: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next commit fail as if the connection dropped
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Make the next `begin` wait forever, like a pool with no free connection
    pub fn stall_next_begin(&self) {
        self.stall_next_begin.store(true, Ordering::SeqCst);
    }

    pub fn insert_institution(&self, institution: Institution) {
        self.lock().institutions.insert(institution.id, institution);
    }

    pub fn insert_requester(&self, requester: Requester) -> Result<(), DatabaseError> {
        let mut state = self.lock();
        if state.requesters.values().any(|r| r.email == requester.email) {
            return Err(DatabaseError::UniqueViolation(format!(
                "users.email {}",
                requester.email
            )));
        }
        state.requesters.insert(requester.id, requester);
        Ok(())
    }

    pub fn insert_reviewer(&self, reviewer: Reviewer) -> Result<(), DatabaseError> {
        let mut state = self.lock();
        if state.reviewers.values().any(|r| r.email == reviewer.email) {
            return Err(DatabaseError::UniqueViolation(format!(
                "pengelola.email {}",
                reviewer.email
            )));
        }
        state.reviewers.insert(reviewer.id, reviewer);
        Ok(())
    }

    /// Committed state of one requester
    pub fn requester(&self, id: Uuid) -> Option<Requester> {
        self.lock().requesters.get(&id).cloned()
    }

    /// Committed state of one request row, without joined columns
    pub fn request(&self, kind: &RequestKind, id: Uuid) -> Option<ServiceRequest> {
        self.lock().requests.get(&(kind.table, id)).cloned()
    }

    pub fn request_count(&self, kind: &RequestKind) -> usize {
        self.lock()
            .requests
            .keys()
            .filter(|(table, _)| *table == kind.table)
            .count()
    }
}

fn joined(state: &State, row: &ServiceRequest) -> ServiceRequest {
    let mut request = row.clone();
    request.institution_name = state
        .institutions
        .get(&row.institution_id)
        .map(|i| i.nama.clone());
    request.notification_token = state
        .requesters
        .get(&row.requester_id)
        .and_then(|r| r.notification_token.clone());
    request
}

/// Copy a staged row (or its absence) into committed state
fn apply<K, V>(committed: &mut HashMap<K, V>, staged: Option<V>, key: K)
where
    K: std::hash::Hash + Eq,
{
    match staged {
        Some(row) => {
            committed.insert(key, row);
        }
        None => {
            committed.remove(&key);
        }
    }
}

fn stored(request: &ServiceRequest) -> ServiceRequest {
    ServiceRequest {
        institution_name: None,
        notification_token: None,
        ..request.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, DatabaseError> {
        if self.stall_next_begin.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(MemoryTx {
            staged: self.lock().clone(),
            writes: Vec::new(),
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), DatabaseError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("connection reset during commit".to_string()));
        }

        let MemoryTx { mut staged, writes } = tx;
        let mut state = self.lock();
        for key in writes {
            match key {
                RowKey::Requester(id) => apply(&mut state.requesters, staged.requesters.remove(&id), id),
                RowKey::Reviewer(id) => apply(&mut state.reviewers, staged.reviewers.remove(&id), id),
                RowKey::Request(table, id) => {
                    apply(&mut state.requests, staged.requests.remove(&(table, id)), (table, id))
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn insert_request(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError> {
        if !tx.staged.institutions.contains_key(&request.institution_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "{}.instansi_id {}",
                kind.table, request.institution_id
            )));
        }
        if !tx.staged.requesters.contains_key(&request.requester_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "{}.user_id {}",
                kind.table, request.requester_id
            )));
        }
        let key = (kind.table, request.id);
        if tx.staged.requests.contains_key(&key) {
            return Err(DatabaseError::UniqueViolation(format!("{}.id {}", kind.table, request.id)));
        }

        tx.staged.requests.insert(key, stored(request));
        tx.touch(RowKey::Request(kind.table, request.id));
        Ok(())
    }

    async fn update_request(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        request: &ServiceRequest,
    ) -> Result<(), DatabaseError> {
        if !tx.staged.institutions.contains_key(&request.institution_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "{}.instansi_id {}",
                kind.table, request.institution_id
            )));
        }
        let row = tx
            .staged
            .requests
            .get_mut(&(kind.table, request.id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind.table, request.id)))?;

        row.fields = request.fields.clone();
        row.attachments = request.attachments.clone();
        row.institution_id = request.institution_id;
        row.updated_at = request.updated_at;
        tx.touch(RowKey::Request(kind.table, request.id));
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        id: Uuid,
        status: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let row = tx
            .staged
            .requests
            .get_mut(&(kind.table, id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind.table, id)))?;

        row.status = status;
        row.updated_at = Some(updated_at);
        tx.touch(RowKey::Request(kind.table, id));
        Ok(())
    }

    async fn delete_request(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<(), DatabaseError> {
        tx.staged
            .requests
            .remove(&(kind.table, id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind.table, id)))?;
        tx.touch(RowKey::Request(kind.table, id));
        Ok(())
    }

    async fn find_request(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        id: Uuid,
    ) -> Result<Option<ServiceRequest>, DatabaseError> {
        Ok(tx
            .staged
            .requests
            .get(&(kind.table, id))
            .map(|row| joined(&tx.staged, row)))
    }

    async fn list_requests(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        owner: Option<Uuid>,
    ) -> Result<Vec<ServiceRequest>, DatabaseError> {
        let mut rows: Vec<ServiceRequest> = tx
            .staged
            .requests
            .iter()
            .filter(|((table, _), row)| {
                *table == kind.table && owner.map_or(true, |owner| row.requester_id == owner)
            })
            .map(|(_, row)| joined(&tx.staged, row))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn count_requests(
        &self,
        tx: &mut MemoryTx,
        kind: &RequestKind,
        owner: Option<Uuid>,
        year: Option<i32>,
    ) -> Result<Vec<StatusBucket>, DatabaseError> {
        let mut counts: BTreeMap<(u32, &'static str), (RequestStatus, i64)> = BTreeMap::new();
        for ((table, _), row) in &tx.staged.requests {
            if *table != kind.table
                || owner.is_some_and(|owner| row.requester_id != owner)
                || year.is_some_and(|year| row.created_at.year() != year)
            {
                continue;
            }
            counts
                .entry((row.created_at.month(), row.status.as_str()))
                .or_insert((row.status, 0))
                .1 += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((month, _), (status, count))| StatusBucket {
                month,
                status,
                count,
            })
            .collect())
    }

    async fn institution_exists(&self, tx: &mut MemoryTx, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(tx.staged.institutions.contains_key(&id))
    }
}

#[async_trait]
impl PrincipalRepository for MemoryStore {
    async fn find_requester_by_email(
        &self,
        tx: &mut MemoryTx,
        email: &str,
    ) -> Result<Option<Requester>, DatabaseError> {
        Ok(tx
            .staged
            .requesters
            .values()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn find_requester_by_id(
        &self,
        tx: &mut MemoryTx,
        id: Uuid,
    ) -> Result<Option<Requester>, DatabaseError> {
        Ok(tx.staged.requesters.get(&id).cloned())
    }

    async fn set_notification_token(
        &self,
        tx: &mut MemoryTx,
        requester_id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError> {
        let requester = tx
            .staged
            .requesters
            .get_mut(&requester_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("users {}", requester_id)))?;
        requester.notification_token = Some(token.to_string());
        tx.touch(RowKey::Requester(requester_id));
        Ok(())
    }

    async fn set_requester_password(
        &self,
        tx: &mut MemoryTx,
        requester_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let requester = tx
            .staged
            .requesters
            .get_mut(&requester_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("users {}", requester_id)))?;
        requester.password = password_hash.to_string();
        tx.touch(RowKey::Requester(requester_id));
        Ok(())
    }

    async fn find_reviewer_by_email(
        &self,
        tx: &mut MemoryTx,
        email: &str,
    ) -> Result<Option<Reviewer>, DatabaseError> {
        Ok(tx
            .staged
            .reviewers
            .values()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn set_reviewer_password(
        &self,
        tx: &mut MemoryTx,
        reviewer_id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let reviewer = tx
            .staged
            .reviewers
            .get_mut(&reviewer_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("pengelola {}", reviewer_id)))?;
        reviewer.password = password_hash.to_string();
        tx.touch(RowKey::Reviewer(reviewer_id));
        Ok(())
    }
}
