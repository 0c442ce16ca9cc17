//! Commits a transferred object into the owner's settings.
//!
//! The server never sees the payload. Before a key is written into the settings
//! record the gateway is asked whether an object is actually stored under it, and
//! the key must have been issued for the same owner. The stored object must carry the
//! digest its upload ticket was issued for, and when the gateway reports the digest
//! of the stored content the two must agree.

use brandmark_core::models::{AssetPurpose, SessionContext, SettingsChanges, SettingsRecord, StoredObject};
use brandmark_core::AppError;
use brandmark_db::{SettingsCommit, SettingsRepository};
use brandmark_storage::{parse_object_key, StorageError, StorageGateway};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Result of a settings write that may have replaced the logo.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub record: SettingsRecord,
    /// Key that was referenced before this write. The object is left in place.
    pub superseded_object_key: Option<String>,
    pub changed: bool,
}

impl From<SettingsCommit> for FinalizeOutcome {
    fn from(commit: SettingsCommit) -> Self {
        Self {
            record: commit.record,
            superseded_object_key: commit.superseded_logo_key,
            changed: commit.changed,
        }
    }
}

#[derive(Clone)]
pub struct FinalizationCommitter {
    storage: Arc<dyn StorageGateway>,
    repository: Arc<dyn SettingsRepository>,
    max_size: u64,
}

impl FinalizationCommitter {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        repository: Arc<dyn SettingsRepository>,
        max_size: u64,
    ) -> Self {
        Self {
            storage,
            repository,
            max_size,
        }
    }

    /// Current settings for `owner_id`. Organizations that never saved anything get
    /// an empty record at version 0.
    pub async fn get_settings(
        &self,
        session: &SessionContext,
        owner_id: Uuid,
    ) -> Result<SettingsRecord, AppError> {
        session.ensure_member_of(owner_id)?;
        Ok(self
            .repository
            .get(owner_id)
            .await?
            .unwrap_or_else(|| SettingsRecord::new(owner_id, "")))
    }

    /// Point the owner's logo at `object_key` once the gateway confirms the object.
    ///
    /// Finalizing the key that is already current returns the record unchanged.
    #[tracing::instrument(
        skip(self, session),
        fields(owner_id = %owner_id, user_id = %session.user_id)
    )]
    pub async fn finalize(
        &self,
        session: &SessionContext,
        owner_id: Uuid,
        object_key: &str,
    ) -> Result<FinalizeOutcome, AppError> {
        self.save_settings(session, owner_id, SettingsChanges::logo_only(object_key))
            .await
    }

    /// Apply a settings save in one atomic write. A `logo_object_key` in `changes`
    /// is confirmed with the gateway first.
    #[tracing::instrument(
        skip(self, session, changes),
        fields(
            owner_id = %owner_id,
            user_id = %session.user_id,
            logo_object_key = ?changes.logo_object_key
        )
    )]
    pub async fn save_settings(
        &self,
        session: &SessionContext,
        owner_id: Uuid,
        changes: SettingsChanges,
    ) -> Result<FinalizeOutcome, AppError> {
        let start = Instant::now();
        session.ensure_can_administer(owner_id)?;

        if let Some(object_key) = changes.logo_object_key.as_deref() {
            let stored = self.confirm_object(owner_id, object_key).await?;
            tracing::debug!(
                object_key = %stored.object_key,
                byte_size = stored.byte_size,
                digest = ?stored.digest,
                "Object confirmed by storage gateway"
            );
        }

        let outcome = FinalizeOutcome::from(self.repository.apply_changes(owner_id, &changes).await?);

        if let Some(previous) = &outcome.superseded_object_key {
            tracing::info!(
                owner_id = %owner_id,
                superseded_object_key = %previous,
                "Logo replaced, previous object left for orphan collection"
            );
        }

        tracing::info!(
            owner_id = %owner_id,
            version = outcome.record.version,
            changed = outcome.changed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Settings committed"
        );

        Ok(outcome)
    }

    /// The key must name a logo issued for `owner_id` and an object must be stored
    /// under it, within the size limit.
    async fn confirm_object(&self, owner_id: Uuid, object_key: &str) -> Result<StoredObject, AppError> {
        let parsed = parse_object_key(object_key).map_err(|e| match e {
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => other.into(),
        })?;

        if parsed.owner_id != owner_id {
            return Err(AppError::Unauthorized(format!(
                "Object key was not issued for organization {}",
                owner_id
            )));
        }
        if parsed.purpose != AssetPurpose::Logo {
            return Err(AppError::InvalidInput(format!(
                "Object key is not a {} key",
                AssetPurpose::Logo
            )));
        }

        let stored = self.storage.stat(object_key).await?.ok_or_else(|| {
            AppError::NotFound(format!("Object not transferred: {}", object_key))
        })?;

        if stored.byte_size > self.max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "{} bytes exceeds max {} bytes",
                stored.byte_size, self.max_size
            )));
        }

        let declared = stored.declared_digest.as_deref().ok_or_else(|| {
            AppError::IntegrityMismatch(format!(
                "Object was not stored through an upload ticket: {}",
                object_key
            ))
        })?;
        if let Some(actual) = stored.digest.as_deref() {
            if actual != declared {
                tracing::warn!(
                    object_key = %object_key,
                    declared = %declared,
                    actual = %actual,
                    "Stored content does not match the ticket digest"
                );
                return Err(AppError::IntegrityMismatch(format!(
                    "Stored content does not match the declared digest: {}",
                    object_key
                )));
            }
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandmark_core::models::{UserRole, Visibility};
    use brandmark_core::{ContentDigest, StorageBackend};
    use brandmark_db::InMemorySettingsRepository;
    use brandmark_storage::{generate_object_key, LocalStorage, PutConstraints};
    use bytes::Bytes;
    use std::time::Duration;
    use tempfile::TempDir;

    const SECRET: &str = "storage-signing-secret-for-tests-0123456789";
    const MAX: u64 = 1024;

    struct Fixture {
        _dir: TempDir,
        storage: LocalStorage,
        repository: InMemorySettingsRepository,
        committer: FinalizationCommitter,
        owner: Uuid,
        session: SessionContext,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(
            dir.path(),
            "http://localhost:3000/storage".to_string(),
            SECRET,
        )
        .await
        .unwrap();
        let repository = InMemorySettingsRepository::new();
        let committer = FinalizationCommitter::new(
            Arc::new(storage.clone()),
            Arc::new(repository.clone()),
            MAX,
        );
        let owner = Uuid::new_v4();
        Fixture {
            _dir: dir,
            storage,
            repository,
            committer,
            owner,
            session: SessionContext::new(Uuid::new_v4(), owner, UserRole::Admin),
        }
    }

    /// Store `payload` under a fresh key for `owner` through a signed PUT.
    async fn upload(storage: &LocalStorage, owner: Uuid, payload: &[u8]) -> String {
        let key = generate_object_key(owner, AssetPurpose::Logo, "png");
        let digest = ContentDigest::compute(payload);
        let constraints = PutConstraints {
            content_type: "image/png".to_string(),
            digest,
            max_size: MAX,
            byte_size: payload.len() as u64,
            visibility: Visibility::Public,
        };
        let presigned = storage
            .presigned_put_url(&key, &constraints, Duration::from_secs(60))
            .await
            .unwrap();
        // Tokens are URL-safe base64 and pass through query encoding unchanged.
        let token = presigned.url.split("token=").nth(1).unwrap();
        storage
            .accept_put(
                &key,
                token,
                Some("image/png"),
                Some(&digest.to_base64()),
                Bytes::copy_from_slice(payload),
            )
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn finalize_commits_confirmed_object() {
        let f = fixture().await;
        let key = upload(&f.storage, f.owner, b"logo bytes").await;

        let outcome = f.committer.finalize(&f.session, f.owner, &key).await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.record.logo_object_key.as_deref(), Some(key.as_str()));
        assert_eq!(outcome.record.version, 1);
        assert_eq!(outcome.superseded_object_key, None);
    }

    #[tokio::test]
    async fn finalize_is_idempotent() {
        let f = fixture().await;
        let key = upload(&f.storage, f.owner, b"logo bytes").await;

        let first = f.committer.finalize(&f.session, f.owner, &key).await.unwrap();
        let second = f.committer.finalize(&f.session, f.owner, &key).await.unwrap();

        assert!(!second.changed);
        assert_eq!(second.record, first.record);
    }

    #[tokio::test]
    async fn replacing_logo_reports_previous_key() {
        let f = fixture().await;
        let old = upload(&f.storage, f.owner, b"old logo").await;
        let new = upload(&f.storage, f.owner, b"new logo").await;

        f.committer.finalize(&f.session, f.owner, &old).await.unwrap();
        let outcome = f.committer.finalize(&f.session, f.owner, &new).await.unwrap();

        assert_eq!(outcome.superseded_object_key, Some(old.clone()));
        // Previous object is not deleted
        assert!(f.storage.stat(&old).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn untransferred_key_is_not_found() {
        let f = fixture().await;
        let key = generate_object_key(f.owner, AssetPurpose::Logo, "png");

        let err = f.committer.finalize(&f.session, f.owner, &key).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(f.repository.get(f.owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_key_is_unauthorized() {
        let f = fixture().await;
        let other_owner = Uuid::new_v4();
        let foreign = upload(&f.storage, other_owner, b"someone else").await;

        let err = f
            .committer
            .finalize(&f.session, f.owner, &foreign)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn malformed_key_is_invalid_input() {
        let f = fixture().await;
        for key in ["", "logos/not-a-uuid/x.png", "../etc/passwd", "logos/a/b/c/d"] {
            let err = f.committer.finalize(&f.session, f.owner, key).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "key {:?}", key);
        }
    }

    #[tokio::test]
    async fn member_cannot_finalize() {
        let f = fixture().await;
        let key = upload(&f.storage, f.owner, b"logo").await;
        let member = SessionContext::new(Uuid::new_v4(), f.owner, UserRole::Member);

        let err = f.committer.finalize(&member, f.owner, &key).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_prior_value() {
        let f = fixture().await;
        let first = upload(&f.storage, f.owner, b"first").await;
        let second = upload(&f.storage, f.owner, b"second").await;
        f.committer.finalize(&f.session, f.owner, &first).await.unwrap();

        f.repository.set_unavailable(true);
        let err = f
            .committer
            .finalize(&f.session, f.owner, &second)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Persistence(_)));
        f.repository.set_unavailable(false);
        let record = f.committer.get_settings(&f.session, f.owner).await.unwrap();
        assert_eq!(record.logo_object_key, Some(first));
    }

    #[tokio::test]
    async fn concurrent_finalize_leaves_one_key() {
        let f = fixture().await;
        let mut keys = Vec::new();
        for n in 0..4u8 {
            keys.push(upload(&f.storage, f.owner, &[n; 8]).await);
        }

        let attempts = keys.iter().map(|key| {
            let committer = f.committer.clone();
            let session = f.session.clone();
            let owner = f.owner;
            let key = key.clone();
            async move { committer.finalize(&session, owner, &key).await }
        });
        let outcomes = futures::future::join_all(attempts).await;
        assert!(outcomes.iter().all(|o| o.is_ok()));

        let record = f.committer.get_settings(&f.session, f.owner).await.unwrap();
        assert_eq!(record.version, 4);
        let current = record.logo_object_key.unwrap();
        assert!(keys.contains(&current));
    }

    #[tokio::test]
    async fn object_written_without_ticket_is_not_finalized() {
        let f = fixture().await;
        let key = generate_object_key(f.owner, AssetPurpose::Logo, "png");
        let path = f._dir.path().join(&key);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"unsigned bytes").await.unwrap();

        let err = f.committer.finalize(&f.session, f.owner, &key).await.unwrap_err();

        assert!(matches!(err, AppError::IntegrityMismatch(_)));
        assert!(f.repository.get(f.owner).await.unwrap().is_none());
    }

    /// Gateway that reports one fixed object for every key.
    struct FixedObjectGateway(StoredObject);

    #[async_trait::async_trait]
    impl StorageGateway for FixedObjectGateway {
        async fn presigned_put_url(
            &self,
            _object_key: &str,
            _constraints: &PutConstraints,
            _expires_in: Duration,
        ) -> brandmark_storage::StorageResult<brandmark_storage::PresignedPut> {
            Err(StorageError::BackendError("read-only".to_string()))
        }

        async fn stat(&self, object_key: &str) -> brandmark_storage::StorageResult<Option<StoredObject>> {
            Ok(Some(StoredObject {
                object_key: object_key.to_string(),
                ..self.0.clone()
            }))
        }

        fn public_url(&self, object_key: &str) -> String {
            format!("https://cdn.example.com/{}", object_key)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    fn committer_over(stored: StoredObject) -> FinalizationCommitter {
        FinalizationCommitter::new(
            Arc::new(FixedObjectGateway(stored)),
            Arc::new(InMemorySettingsRepository::new()),
            MAX,
        )
    }

    #[tokio::test]
    async fn stored_digest_must_match_declared_digest() {
        let owner = Uuid::new_v4();
        let session = SessionContext::new(Uuid::new_v4(), owner, UserRole::Admin);
        let key = generate_object_key(owner, AssetPurpose::Logo, "png");
        let declared = ContentDigest::compute(b"declared logo").to_base64();

        let tampered = committer_over(StoredObject {
            object_key: String::new(),
            byte_size: 13,
            digest: Some(ContentDigest::compute(b"swapped logo!").to_base64()),
            declared_digest: Some(declared.clone()),
            visibility: Visibility::Public,
        });
        let err = tampered.finalize(&session, owner, &key).await.unwrap_err();
        assert!(matches!(err, AppError::IntegrityMismatch(_)));

        // Multipart uploads report no content digest; the declared one is trusted.
        let opaque = committer_over(StoredObject {
            object_key: String::new(),
            byte_size: 13,
            digest: None,
            declared_digest: Some(declared),
            visibility: Visibility::Public,
        });
        let outcome = opaque.finalize(&session, owner, &key).await.unwrap();
        assert_eq!(outcome.record.logo_object_key.as_deref(), Some(key.as_str()));
    }

    #[tokio::test]
    async fn settings_default_for_new_owner() {
        let f = fixture().await;
        let viewer = SessionContext::new(Uuid::new_v4(), f.owner, UserRole::Viewer);
        let record = f.committer.get_settings(&viewer, f.owner).await.unwrap();
        assert_eq!(record.version, 0);
        assert_eq!(record.logo_object_key, None);
        assert_eq!(f.storage.backend_type(), StorageBackend::Local);
    }
}
