use async_trait::async_trait;
use brandmark_core::models::{SettingsChanges, SettingsRecord};
use brandmark_core::AppError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::settings::{SettingsCommit, SettingsRepository};

/// In-process settings repository for development without Postgres and for tests.
///
/// The write lock plays the role of the row lock: writers for any owner run one at
/// a time.
#[derive(Clone, Default)]
pub struct InMemorySettingsRepository {
    records: Arc<RwLock<HashMap<Uuid, SettingsRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a persistence error, as an
    /// unreachable database would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed a record, replacing any existing one.
    pub async fn insert(&self, record: SettingsRecord) {
        self.records.write().await.insert(record.owner_id, record);
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(&self, owner_id: Uuid) -> Result<Option<SettingsRecord>, AppError> {
        Ok(self.records.read().await.get(&owner_id).cloned())
    }

    async fn apply_changes(
        &self,
        owner_id: Uuid,
        changes: &SettingsChanges,
    ) -> Result<SettingsCommit, AppError> {
        let mut records = self.records.write().await;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(
                "settings store unavailable".to_string(),
            ));
        }

        let current = records
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| SettingsRecord::new(owner_id, ""));

        if changes.is_noop_for(&current) {
            return Ok(SettingsCommit::compute(&current, current.clone(), false));
        }

        let mut next = changes.apply_to(&current);
        next.version = current.version + 1;
        next.updated_at = Utc::now();
        records.insert(owner_id, next.clone());

        Ok(SettingsCommit::compute(&current, next, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> String {
        format!("logos/{}/{:08}-0000-4000-8000-000000000000.png", Uuid::nil(), n)
    }

    #[tokio::test]
    async fn first_write_creates_record() {
        let repo = InMemorySettingsRepository::new();
        let owner = Uuid::new_v4();
        assert!(repo.get(owner).await.unwrap().is_none());

        let commit = repo
            .apply_changes(owner, &SettingsChanges::logo_only(key(1)))
            .await
            .unwrap();
        assert!(commit.changed);
        assert_eq!(commit.record.version, 1);
        assert_eq!(commit.superseded_logo_key, None);
        assert_eq!(
            repo.get(owner).await.unwrap().unwrap().logo_object_key,
            Some(key(1))
        );
    }

    #[tokio::test]
    async fn replacing_logo_reports_superseded_key() {
        let repo = InMemorySettingsRepository::new();
        let owner = Uuid::new_v4();
        repo.apply_changes(owner, &SettingsChanges::logo_only(key(1)))
            .await
            .unwrap();

        let commit = repo
            .apply_changes(owner, &SettingsChanges::logo_only(key(2)))
            .await
            .unwrap();
        assert_eq!(commit.superseded_logo_key, Some(key(1)));
        assert_eq!(commit.record.version, 2);
    }

    #[tokio::test]
    async fn repeated_write_is_a_noop() {
        let repo = InMemorySettingsRepository::new();
        let owner = Uuid::new_v4();
        let first = repo
            .apply_changes(owner, &SettingsChanges::logo_only(key(1)))
            .await
            .unwrap();
        let second = repo
            .apply_changes(owner, &SettingsChanges::logo_only(key(1)))
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(second.record, first.record);
        assert_eq!(second.superseded_logo_key, None);
    }

    #[tokio::test]
    async fn unavailable_store_keeps_prior_value() {
        let repo = InMemorySettingsRepository::new();
        let owner = Uuid::new_v4();
        repo.apply_changes(owner, &SettingsChanges::logo_only(key(1)))
            .await
            .unwrap();

        repo.set_unavailable(true);
        let err = repo
            .apply_changes(owner, &SettingsChanges::logo_only(key(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(
            repo.get(owner).await.unwrap().unwrap().logo_object_key,
            Some(key(1))
        );
    }

    #[tokio::test]
    async fn concurrent_writers_leave_exactly_one_key() {
        let repo = InMemorySettingsRepository::new();
        let owner = Uuid::new_v4();

        let writes = (1..=8).map(|n| {
            let repo = repo.clone();
            async move {
                repo.apply_changes(owner, &SettingsChanges::logo_only(key(n)))
                    .await
                    .unwrap()
            }
        });
        let commits = futures::future::join_all(writes).await;

        let record = repo.get(owner).await.unwrap().unwrap();
        assert_eq!(record.version, 8);
        let last = commits
            .iter()
            .max_by_key(|c| c.record.version)
            .unwrap();
        assert_eq!(record.logo_object_key, last.record.logo_object_key);
    }
}
