use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::format::{detail_view, summary_view, MonthlyCounts, PublicUrls, StatusCounts};
use crate::api::messages;
use crate::attachments::AttachmentStore;
use crate::auth::AccessContext;
use crate::database::models::{AttachmentRefs, FieldValues, ServiceRequest, StatusBucket};
use crate::database::{Backend, UnitOfWork};
use crate::notification::{Notifier, PushData, PushMessage};
use crate::requests::kind::{RequestKind, INSTITUTION_FIELD, KINDS};
use crate::requests::validation::{self, FieldError};
use crate::services::ServiceError;
use crate::types::{AttachmentCategory, RequestStatus};

/// Form contents of a create or update call
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Descriptive fields plus `instansi_id`
    pub fields: FieldValues,
    /// Uploaded bytes keyed by attachment slot
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Files written for one call. Anything not handed over with [`keep`] is
/// removed when the guard goes away, including when the call's future is
/// dropped before it finishes.
///
/// [`keep`]: StagedFiles::keep
struct StagedFiles<'a> {
    store: &'a AttachmentStore,
    files: Vec<(AttachmentCategory, String)>,
}

impl<'a> StagedFiles<'a> {
    fn new(store: &'a AttachmentStore) -> Self {
        Self {
            store,
            files: Vec::new(),
        }
    }

    /// The files now belong to a committed row
    fn keep(mut self) {
        self.files.clear();
    }

    async fn discard(mut self) {
        for (category, name) in std::mem::take(&mut self.files) {
            self.store.discard(category, &name).await;
        }
    }
}

impl Drop for StagedFiles<'_> {
    fn drop(&mut self) {
        for (category, name) in self.files.drain(..) {
            warn!("Removing {} attachment {} left by an unfinished call", category.dir_name(), name);
            self.store.discard_now(category, &name);
        }
    }
}

/// Lifecycle rules shared by all six request kinds.
///
/// Every operation runs its store calls inside one [`UnitOfWork`]; file
/// cleanup and push notifications happen only after the outcome is known.
pub struct LifecycleService<S: Backend> {
    store: S,
    attachments: AttachmentStore,
    notifier: Arc<dyn Notifier>,
    urls: PublicUrls,
}

impl<S: Backend> LifecycleService<S> {
    pub fn new(store: S, attachments: AttachmentStore, notifier: Arc<dyn Notifier>, urls: PublicUrls) -> Self {
        Self {
            store,
            attachments,
            notifier,
            urls,
        }
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    fn require_requester(ctx: &AccessContext) -> Result<Uuid, ServiceError> {
        ctx.requester_id()
            .ok_or_else(|| ServiceError::Auth(messages::ERROR_UNAUTHORIZED.to_string()))
    }

    fn validate_fields(kind: &RequestKind, fields: &FieldValues) -> Vec<FieldError> {
        validation::validate(kind.validation_rules(), fields)
            .err()
            .unwrap_or_default()
    }

    fn institution_id(fields: &FieldValues) -> Result<Uuid, ServiceError> {
        let raw = fields.get(INSTITUTION_FIELD).map(String::as_str).unwrap_or_default();
        Uuid::parse_str(raw)
            .map_err(|_| ServiceError::validation(INSTITUTION_FIELD, "instansi_id must be a valid UUID"))
    }

    fn descriptive_fields(kind: &RequestKind, fields: &FieldValues) -> FieldValues {
        kind.fields
            .iter()
            .map(|spec| {
                let value = fields.get(spec.name).cloned().unwrap_or_default();
                (spec.name.to_string(), value)
            })
            .collect()
    }

    /// Write every supplied file for a known slot. On failure the files
    /// written so far are removed and the error returned.
    async fn store_files<'a>(
        &'a self,
        kind: &RequestKind,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<(StagedFiles<'a>, AttachmentRefs), ServiceError> {
        let mut staged = StagedFiles::new(&self.attachments);
        let mut refs = AttachmentRefs::new();

        for spec in kind.attachments {
            let Some(bytes) = files.get(spec.name) else {
                continue;
            };
            match self.attachments.store(spec.category, bytes).await {
                Ok(name) => {
                    staged.files.push((spec.category, name.clone()));
                    refs.insert(spec.name.to_string(), name);
                }
                Err(e) => {
                    staged.discard().await;
                    return Err(e.into());
                }
            }
        }
        Ok((staged, refs))
    }

    async fn discard_refs(&self, kind: &RequestKind, refs: &AttachmentRefs) {
        for (slot, name) in refs {
            if let Some(spec) = kind.attachment(slot) {
                self.attachments.discard(spec.category, name).await;
            }
        }
    }

    pub async fn create(
        &self,
        ctx: &AccessContext,
        kind: &RequestKind,
        submission: Submission,
    ) -> Result<Value, ServiceError> {
        let requester_id = Self::require_requester(ctx)?;

        let mut errors = Self::validate_fields(kind, &submission.fields);
        for spec in kind.attachments.iter().filter(|a| a.required_on_create) {
            if submission.files.get(spec.name).map_or(true, Vec::is_empty) {
                errors.push(FieldError::new(spec.name, format!("{} is required", spec.name)));
            }
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }
        let institution_id = Self::institution_id(&submission.fields)?;

        let (staged, attachments) = self.store_files(kind, &submission.files).await?;

        let now = Utc::now();
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            fields: Self::descriptive_fields(kind, &submission.fields),
            attachments,
            status: RequestStatus::Pending,
            requester_id,
            institution_id,
            created_at: now,
            updated_at: None,
            institution_name: None,
            notification_token: None,
        };

        let mut uow = match UnitOfWork::begin(&self.store).await {
            Ok(uow) => uow,
            Err(e) => {
                staged.discard().await;
                return Err(e.into());
            }
        };
        let outcome: Result<_, ServiceError> = async {
            if !self.store.institution_exists(uow.tx(), institution_id).await? {
                return Err(ServiceError::NotFound(format!("instansi {}", institution_id)));
            }
            self.store.insert_request(uow.tx(), kind, &request).await?;
            self.store
                .find_request(uow.tx(), kind, request.id)
                .await?
                .ok_or_else(|| ServiceError::Internal(format!("{} {} vanished after insert", kind.table, request.id)))
        }
        .await;

        match uow.complete(outcome).await {
            Ok(created) => {
                staged.keep();
                info!("Created {} request {} for requester {}", kind.slug, created.id, requester_id);
                Ok(detail_view(kind, &created, &self.urls, ctx.kind()))
            }
            Err(e) => {
                staged.discard().await;
                Err(e)
            }
        }
    }

    /// Replace descriptive fields and `instansi_id`; keep each attachment
    /// unless a new file is supplied for its slot.
    pub async fn update(
        &self,
        ctx: &AccessContext,
        kind: &RequestKind,
        id: Uuid,
        submission: Submission,
    ) -> Result<Value, ServiceError> {
        let requester_id = Self::require_requester(ctx)?;

        let errors = Self::validate_fields(kind, &submission.fields);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }
        let institution_id = Self::institution_id(&submission.fields)?;

        let (staged, new_files) = self.store_files(kind, &submission.files).await?;

        let mut uow = match UnitOfWork::begin(&self.store).await {
            Ok(uow) => uow,
            Err(e) => {
                staged.discard().await;
                return Err(e.into());
            }
        };
        let outcome: Result<_, ServiceError> = async {
            let existing = self
                .store
                .find_request(uow.tx(), kind, id)
                .await?
                .filter(|r| r.is_owned_by(requester_id))
                .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.table, id)))?;
            if !existing.status.is_pending() {
                return Err(ServiceError::BusinessRule(messages::RULE_UPDATE_NOT_PENDING.to_string()));
            }
            if !self.store.institution_exists(uow.tx(), institution_id).await? {
                return Err(ServiceError::NotFound(format!("instansi {}", institution_id)));
            }

            let mut replaced = AttachmentRefs::new();
            let mut attachments = existing.attachments.clone();
            for (slot, name) in &new_files {
                if let Some(old) = attachments.insert(slot.clone(), name.clone()) {
                    replaced.insert(slot.clone(), old);
                }
            }

            let updated = ServiceRequest {
                fields: Self::descriptive_fields(kind, &submission.fields),
                attachments,
                institution_id,
                updated_at: Some(Utc::now()),
                ..existing
            };
            self.store.update_request(uow.tx(), kind, &updated).await?;
            let view = self
                .store
                .find_request(uow.tx(), kind, id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.table, id)))?;
            Ok((view, replaced))
        }
        .await;

        match uow.complete(outcome).await {
            Ok((updated, replaced)) => {
                staged.keep();
                self.discard_refs(kind, &replaced).await;
                info!("Updated {} request {}", kind.slug, id);
                Ok(detail_view(kind, &updated, &self.urls, ctx.kind()))
            }
            Err(e) => {
                staged.discard().await;
                Err(e)
            }
        }
    }

    /// Reviewer decision. Any status change, including a second one on an
    /// already decided record, is accepted; the owner is notified after commit.
    pub async fn update_status(
        &self,
        ctx: &AccessContext,
        kind: &RequestKind,
        id: Uuid,
        status: &str,
    ) -> Result<(), ServiceError> {
        if !ctx.is_reviewer() {
            return Err(ServiceError::Auth(messages::ERROR_UNAUTHORIZED.to_string()));
        }
        let status = match status.parse::<RequestStatus>() {
            Ok(s) if !s.is_pending() => s,
            _ => {
                return Err(ServiceError::validation(
                    "status",
                    "status must be one of disetujui, ditolak",
                ))
            }
        };

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            let record = self
                .store
                .find_request(uow.tx(), kind, id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.table, id)))?;
            self.store
                .update_status(uow.tx(), kind, id, status, Utc::now())
                .await?;
            Ok(record)
        }
        .await;
        let record = uow.complete(outcome).await?;
        info!("{} request {} is now {}", kind.slug, id, status);

        self.notify(kind, &record, status).await;
        Ok(())
    }

    async fn notify(&self, kind: &RequestKind, record: &ServiceRequest, status: RequestStatus) {
        let Some(token) = record.notification_token.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };

        let body = format!(
            "Permintaan anda atas nama {}, pada tanggal {}, telah {}",
            record.field(kind.applicant_field),
            record.created_at.format("%d-%m-%Y"),
            status
        );
        let message = PushMessage::new(
            token,
            kind.title,
            body,
            PushData {
                kind: kind.slug.to_string(),
                id: record.id,
                status,
            },
        );

        if let Err(e) = self.notifier.send(&message).await {
            warn!("Push notification for {} {} failed: {}", kind.slug, record.id, e);
        }
    }

    /// Owner-only, pending-only. Attachments are removed after commit.
    pub async fn delete(&self, ctx: &AccessContext, kind: &RequestKind, id: Uuid) -> Result<(), ServiceError> {
        let requester_id = Self::require_requester(ctx)?;

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            let record = self
                .store
                .find_request(uow.tx(), kind, id)
                .await?
                .filter(|r| r.is_owned_by(requester_id))
                .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.table, id)))?;
            if !record.status.is_pending() {
                return Err(ServiceError::BusinessRule(messages::RULE_DELETE_NOT_PENDING.to_string()));
            }
            self.store.delete_request(uow.tx(), kind, id).await?;
            Ok(record)
        }
        .await;
        let record = uow.complete(outcome).await?;
        info!("Deleted {} request {}", kind.slug, id);

        self.discard_refs(kind, &record.attachments).await;
        Ok(())
    }

    /// Reviewers may read any record; requesters only their own
    pub async fn find_by_id(&self, ctx: &AccessContext, kind: &RequestKind, id: Uuid) -> Result<Value, ServiceError> {
        let owner = ctx.requester_id();

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            self.store
                .find_request(uow.tx(), kind, id)
                .await?
                .filter(|r| owner.map_or(true, |owner| r.is_owned_by(owner)))
                .ok_or_else(|| ServiceError::NotFound(format!("{} {}", kind.table, id)))
        }
        .await;
        let record = uow.complete(outcome).await?;

        Ok(detail_view(kind, &record, &self.urls, ctx.kind()))
    }

    /// Newest first; requesters see only their own records
    pub async fn list(&self, ctx: &AccessContext, kind: &RequestKind) -> Result<Vec<Value>, ServiceError> {
        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome = self
            .store
            .list_requests(uow.tx(), kind, ctx.requester_id())
            .await
            .map_err(ServiceError::from);
        let records = uow.complete(outcome).await?;

        Ok(records
            .iter()
            .map(|r| summary_view(kind, r, &self.urls, ctx.kind()))
            .collect())
    }

    async fn buckets(
        &self,
        ctx: &AccessContext,
        kind: Option<&RequestKind>,
        year: Option<i32>,
    ) -> Result<Vec<StatusBucket>, ServiceError> {
        let kinds: Vec<&RequestKind> = match kind {
            Some(kind) => vec![kind],
            None => KINDS.to_vec(),
        };

        let mut uow = UnitOfWork::begin(&self.store).await?;
        let outcome: Result<_, ServiceError> = async {
            let mut buckets = Vec::new();
            for kind in kinds {
                buckets.extend(
                    self.store
                        .count_requests(uow.tx(), kind, ctx.requester_id(), year)
                        .await?,
                );
            }
            Ok(buckets)
        }
        .await;
        uow.complete(outcome).await
    }

    /// Totals across one kind or all six
    pub async fn count_totals(
        &self,
        ctx: &AccessContext,
        kind: Option<&RequestKind>,
    ) -> Result<StatusCounts, ServiceError> {
        let buckets = self.buckets(ctx, kind, None).await?;
        let mut counts = StatusCounts::default();
        for bucket in &buckets {
            add_bucket(&mut counts, bucket);
        }
        Ok(counts)
    }

    /// Twelve zero-filled monthly entries for `year`
    pub async fn count_per_month(
        &self,
        ctx: &AccessContext,
        kind: Option<&RequestKind>,
        year: i32,
    ) -> Result<Vec<MonthlyCounts>, ServiceError> {
        let buckets = self.buckets(ctx, kind, Some(year)).await?;
        let mut months: Vec<MonthlyCounts> = (1..=12)
            .map(|month| MonthlyCounts {
                bulan: format!("{:04}-{:02}", year, month),
                counts: StatusCounts::default(),
            })
            .collect();
        for bucket in &buckets {
            if let Some(entry) = months.get_mut(bucket.month.saturating_sub(1) as usize) {
                add_bucket(&mut entry.counts, bucket);
            }
        }
        Ok(months)
    }
}

fn add_bucket(counts: &mut StatusCounts, bucket: &StatusBucket) {
    counts.total += bucket.count;
    match bucket.status {
        RequestStatus::Pending => counts.diproses += bucket.count,
        RequestStatus::Approved => counts.disetujui += bucket.count,
        RequestStatus::Rejected => counts.ditolak += bucket.count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use crate::database::store::{RequestRepository, Store};
    use crate::database::MemoryStore;
    use crate::requests::kind::{GANGGUAN_JIP, PEMBUATAN_EMAIL, PERUBAHAN_IP_SERVER};
    use crate::testing::{
        seed_institution, seed_requester, seed_reviewer, storage_config, valid_fields, RecordingNotifier, GIF_BYTES,
        PDF_BYTES, PNG_BYTES,
    };
    use tempfile::TempDir;

    struct Fixture {
        store: MemoryStore,
        service: LifecycleService<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        upload_dir: TempDir,
        requester: AccessContext,
        other_requester: AccessContext,
        reviewer: AccessContext,
        institution_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let upload_dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let service = LifecycleService::new(
            store.clone(),
            AttachmentStore::new(upload_dir.path()),
            notifier.clone(),
            PublicUrls::from_config(&storage_config(upload_dir.path())),
        );

        let alice = seed_requester(&store, "alice@example.com").await;
        let bob = seed_requester(&store, "bob@example.com").await;
        let reviewer = seed_reviewer(&store, "pengelola@example.com");
        let institution = seed_institution(&store);

        Fixture {
            store,
            service,
            notifier,
            upload_dir,
            requester: AccessContext::Requester { id: alice.id },
            other_requester: AccessContext::Requester { id: bob.id },
            reviewer: AccessContext::Reviewer {
                id: reviewer.id,
                email: reviewer.email,
                role_id: Some(reviewer.role_id),
            },
            institution_id: institution.id,
        }
    }

    impl Fixture {
        fn submission(&self, kind: &RequestKind) -> Submission {
            Submission {
                fields: valid_fields(kind, self.institution_id),
                files: BTreeMap::new(),
            }
        }

        async fn create(&self, kind: &RequestKind, submission: Submission) -> Uuid {
            let view = self.service.create(&self.requester, kind, submission).await.unwrap();
            view["id"].as_str().unwrap().parse().unwrap()
        }

        fn stored_files(&self, category: AttachmentCategory) -> usize {
            std::fs::read_dir(self.upload_dir.path().join(category.dir_name()))
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    #[tokio::test]
    async fn every_kind_is_created_pending() {
        let fx = fixture().await;
        for kind in KINDS {
            let mut submission = fx.submission(kind);
            if kind.attachments.iter().any(|a| a.required_on_create) {
                submission.files.insert("surat_permohonan".into(), PDF_BYTES.to_vec());
            }
            let view = fx.service.create(&fx.requester, kind, submission).await.unwrap();
            assert_eq!(view["status"], "diproses", "{}", kind.slug);
        }
    }

    #[tokio::test]
    async fn create_reports_every_invalid_field() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.fields.insert("nip".into(), "12345".into());
        submission.fields.remove("jabatan");

        let err = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission).await.unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["nip", "jabatan"]);
        assert_eq!(fx.store.request_count(&PEMBUATAN_EMAIL), 0);
    }

    #[tokio::test]
    async fn required_attachment_is_checked_before_storing() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(&fx.requester, &PERUBAHAN_IP_SERVER, fx.submission(&PERUBAHAN_IP_SERVER))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref errors) if errors[0].field == "surat_permohonan"));
    }

    #[tokio::test]
    async fn gif_in_pdf_slot_is_rejected_without_creating_a_record() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        submission.files.insert("surat_permohonan".into(), GIF_BYTES.to_vec());

        let err = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFile(ref mime) if mime == "image/gif"));
        assert_eq!(fx.store.request_count(&PEMBUATAN_EMAIL), 0);
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 0);
    }

    #[tokio::test]
    async fn failed_commit_removes_uploaded_files() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        fx.store.fail_next_commit();

        let err = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 0);
    }

    #[tokio::test]
    async fn cancelled_create_leaves_no_files_behind() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        fx.store.stall_next_begin();

        let pending = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(200), pending).await;
        assert!(timed_out.is_err());

        assert_eq!(fx.store.request_count(&PEMBUATAN_EMAIL), 0);
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 0);
    }

    #[tokio::test]
    async fn cancelled_update_keeps_the_committed_file_only() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        let id = fx.create(&PEMBUATAN_EMAIL, submission).await;
        let before = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap();

        let mut replacement = fx.submission(&PEMBUATAN_EMAIL);
        replacement.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        fx.store.stall_next_begin();
        let pending = fx.service.update(&fx.requester, &PEMBUATAN_EMAIL, id, replacement);
        assert!(tokio::time::timeout(std::time::Duration::from_millis(200), pending)
            .await
            .is_err());

        let after = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap();
        assert_eq!(after.attachment("berkas_sk"), before.attachment("berkas_sk"));
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 1);
    }

    #[tokio::test]
    async fn unknown_institution_is_not_found() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission
            .fields
            .insert(INSTITUTION_FIELD.into(), Uuid::new_v4().to_string());

        let err = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_of_decided_record_fails_and_keeps_files() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        let id = fx.create(&PEMBUATAN_EMAIL, submission).await;

        for status in ["disetujui", "ditolak"] {
            fx.service
                .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, status)
                .await
                .unwrap();
            let err = fx.service.delete(&fx.requester, &PEMBUATAN_EMAIL, id).await.unwrap_err();
            assert!(matches!(err, ServiceError::BusinessRule(ref msg) if msg == messages::RULE_DELETE_NOT_PENDING));
            assert!(fx.store.request(&PEMBUATAN_EMAIL, id).is_some());
            assert_eq!(fx.stored_files(AttachmentCategory::Document), 1);
        }
    }

    #[tokio::test]
    async fn delete_of_pending_record_removes_row_and_files() {
        let fx = fixture().await;
        let mut submission = fx.submission(&GANGGUAN_JIP);
        submission.files.insert("surat_permohonan".into(), PDF_BYTES.to_vec());
        submission.files.insert("foto".into(), PNG_BYTES.to_vec());
        let id = fx.create(&GANGGUAN_JIP, submission).await;
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 1);
        assert_eq!(fx.stored_files(AttachmentCategory::Image), 1);

        fx.service.delete(&fx.requester, &GANGGUAN_JIP, id).await.unwrap();

        assert_eq!(fx.stored_files(AttachmentCategory::Document), 0);
        assert_eq!(fx.stored_files(AttachmentCategory::Image), 0);
        let err = fx.service.find_by_id(&fx.reviewer, &GANGGUAN_JIP, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn other_requesters_records_resolve_as_not_found() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        let err = fx
            .service
            .find_by_id(&fx.other_requester, &PEMBUATAN_EMAIL, id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = fx
            .service
            .delete(&fx.other_requester, &PEMBUATAN_EMAIL, id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(fx.service.find_by_id(&fx.reviewer, &PEMBUATAN_EMAIL, id).await.is_ok());
    }

    #[tokio::test]
    async fn second_status_change_is_accepted() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "disetujui")
            .await
            .unwrap();
        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "ditolak")
            .await
            .unwrap();

        let row = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap();
        assert_eq!(row.status, RequestStatus::Rejected);
        assert!(row.updated_at.is_some());
    }

    #[tokio::test]
    async fn status_must_be_a_decision() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        for status in ["diproses", "approved", ""] {
            let err = fx
                .service
                .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, status)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{}", status);
        }
        let err = fx
            .service
            .update_status(&fx.requester, &PEMBUATAN_EMAIL, id, "disetujui")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[tokio::test]
    async fn email_request_scenario_notifies_owner() {
        let fx = fixture().await;
        let AccessContext::Requester { id: alice } = fx.requester else {
            unreachable!()
        };
        let mut tx = fx.store.begin().await.unwrap();
        crate::database::PrincipalRepository::set_notification_token(
            &fx.store,
            &mut tx,
            alice,
            "ExponentPushToken[alice]",
        )
        .await
        .unwrap();
        fx.store.commit(tx).await.unwrap();

        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.fields.insert("nip".into(), "123456789012345678".into());
        let view = fx.service.create(&fx.requester, &PEMBUATAN_EMAIL, submission).await.unwrap();
        assert_eq!(view["status"], "diproses");
        let id: Uuid = view["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(fx.store.request(&PEMBUATAN_EMAIL, id).unwrap().requester_id, alice);

        fx.notifier.fail_sends();
        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "disetujui")
            .await
            .unwrap();

        let sent = fx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ExponentPushToken[alice]");
        assert_eq!(sent[0].title, "Layanan Pembuatan Email");
        assert!(sent[0].body.ends_with("telah disetujui"), "{}", sent[0].body);
        assert_eq!(
            fx.store.request(&PEMBUATAN_EMAIL, id).unwrap().status,
            RequestStatus::Approved
        );

        let err = fx.service.delete(&fx.requester, &PEMBUATAN_EMAIL, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn no_notification_without_device_token() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;
        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "ditolak")
            .await
            .unwrap();
        assert!(fx.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn concurrent_status_updates_are_last_commit_wins() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        // Both transactions read the pending row before either commits
        let mut first = fx.store.begin().await.unwrap();
        let mut second = fx.store.begin().await.unwrap();
        for tx in [&mut first, &mut second] {
            let row = fx.store.find_request(tx, &PEMBUATAN_EMAIL, id).await.unwrap().unwrap();
            assert_eq!(row.status, RequestStatus::Pending);
        }
        fx.store
            .update_status(&mut first, &PEMBUATAN_EMAIL, id, RequestStatus::Approved, Utc::now())
            .await
            .unwrap();
        fx.store
            .update_status(&mut second, &PEMBUATAN_EMAIL, id, RequestStatus::Rejected, Utc::now())
            .await
            .unwrap();

        fx.store.commit(first).await.unwrap();
        assert_eq!(fx.store.request(&PEMBUATAN_EMAIL, id).unwrap().status, RequestStatus::Approved);
        fx.store.commit(second).await.unwrap();
        assert_eq!(fx.store.request(&PEMBUATAN_EMAIL, id).unwrap().status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn concurrent_service_calls_both_succeed() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        let (a, b) = tokio::join!(
            fx.service.update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "disetujui"),
            fx.service.update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "ditolak"),
        );
        assert!(a.is_ok() && b.is_ok());
        let status = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap().status;
        assert!(matches!(status, RequestStatus::Approved | RequestStatus::Rejected));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_unreplaced_files() {
        let fx = fixture().await;
        let mut submission = fx.submission(&PEMBUATAN_EMAIL);
        submission.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        submission.files.insert("surat_permohonan".into(), PDF_BYTES.to_vec());
        let id = fx.create(&PEMBUATAN_EMAIL, submission).await;
        let before = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap();

        let mut update = fx.submission(&PEMBUATAN_EMAIL);
        update.fields.insert("jabatan".into(), "Kepala Bidang".into());
        update.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        let view = fx.service.update(&fx.requester, &PEMBUATAN_EMAIL, id, update).await.unwrap();
        assert_eq!(view["jabatan"], "Kepala Bidang");

        let after = fx.store.request(&PEMBUATAN_EMAIL, id).unwrap();
        assert_ne!(after.attachment("berkas_sk"), before.attachment("berkas_sk"));
        assert_eq!(after.attachment("surat_permohonan"), before.attachment("surat_permohonan"));
        assert_eq!(after.status, RequestStatus::Pending);
        assert!(after.updated_at.is_some());
        // the replaced berkas_sk is gone, the new one and surat_permohonan remain
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 2);
    }

    #[tokio::test]
    async fn update_requires_ownership_and_pending_status() {
        let fx = fixture().await;
        let id = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;

        let err = fx
            .service
            .update(&fx.other_requester, &PEMBUATAN_EMAIL, id, fx.submission(&PEMBUATAN_EMAIL))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, id, "disetujui")
            .await
            .unwrap();
        let mut update = fx.submission(&PEMBUATAN_EMAIL);
        update.files.insert("berkas_sk".into(), PDF_BYTES.to_vec());
        let err = fx
            .service
            .update(&fx.requester, &PEMBUATAN_EMAIL, id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BusinessRule(ref msg) if msg == messages::RULE_UPDATE_NOT_PENDING));
        assert_eq!(fx.stored_files(AttachmentCategory::Document), 0);
    }

    #[tokio::test]
    async fn list_is_scoped_by_caller() {
        let fx = fixture().await;
        fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;
        fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;
        fx.service
            .create(&fx.other_requester, &PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL))
            .await
            .unwrap();

        let mine = fx.service.list(&fx.requester, &PEMBUATAN_EMAIL).await.unwrap();
        let all = fx.service.list(&fx.reviewer, &PEMBUATAN_EMAIL).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(all.len(), 3);
        assert!(mine[0]["created_at"].as_str() >= mine[1]["created_at"].as_str());
    }

    #[tokio::test]
    async fn counts_aggregate_across_kinds() {
        let fx = fixture().await;
        let approved = fx.create(&PEMBUATAN_EMAIL, fx.submission(&PEMBUATAN_EMAIL)).await;
        fx.create(&GANGGUAN_JIP, fx.submission(&GANGGUAN_JIP)).await;
        fx.service
            .create(&fx.other_requester, &GANGGUAN_JIP, fx.submission(&GANGGUAN_JIP))
            .await
            .unwrap();
        fx.service
            .update_status(&fx.reviewer, &PEMBUATAN_EMAIL, approved, "disetujui")
            .await
            .unwrap();

        let all = fx.service.count_totals(&fx.reviewer, None).await.unwrap();
        assert_eq!(
            all,
            StatusCounts {
                total: 3,
                diproses: 2,
                disetujui: 1,
                ditolak: 0
            }
        );
        let mine = fx.service.count_totals(&fx.requester, Some(&GANGGUAN_JIP)).await.unwrap();
        assert_eq!(mine.total, 1);

        let year = Utc::now().year();
        let monthly = fx.service.count_per_month(&fx.reviewer, None, year).await.unwrap();
        assert_eq!(monthly.len(), 12);
        assert_eq!(monthly[0].bulan, format!("{}-01", year));
        assert_eq!(monthly.iter().map(|m| m.counts.total).sum::<i64>(), 3);

        let empty = fx.service.count_per_month(&fx.reviewer, None, year - 1).await.unwrap();
        assert!(empty.iter().all(|m| m.counts == StatusCounts::default()));
    }
}
