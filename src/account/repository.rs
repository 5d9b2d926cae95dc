//! Persistence seams for accounts, reports and the moderation log.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::ServiceError;
use crate::account::{ModerationEntry, UserAccount, UserId, UserRecord};
use crate::error::Result;

/// Account id treated as not yet persisted; [`AccountStore::save`] assigns
/// a real one.
pub const UNSAVED: UserId = 0;

/// Store seam implemented by the host's database adapter.
///
/// Uniqueness of `name` and `email` is the store's responsibility and is
/// reported as [`ServiceError::Conflict`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load one account.
    async fn load(&self, id: UserId) -> Result<UserAccount>;

    /// Persist an account, returning the stored aggregate.
    async fn save(&self, account: &UserAccount) -> Result<UserAccount>;

    /// Persist two accounts so that either both or neither commit.
    async fn save_pair(
        &self,
        first: &UserAccount,
        second: &UserAccount,
    ) -> Result<()>;

    /// Find an account by display name.
    async fn find_by_name(&self, name: &str) -> Result<Option<UserAccount>>;

    /// Find an account matching both name and email.
    async fn find_by_name_and_email(
        &self,
        name: &str,
        email: &str,
    ) -> Result<Option<UserAccount>>;

    /// Append an entry to the moderation log.
    async fn append_moderation_entry(
        &self,
        entry: &ModerationEntry,
    ) -> Result<()>;
}

/// Store seam for behavioral reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// File a report against `subject`.
    async fn file(
        &self,
        subject: UserId,
        is_positive: bool,
        body: &str,
        reported_by: UserId,
    ) -> Result<UserRecord>;

    /// Close a report.
    async fn resolve(&self, report_id: i64) -> Result<()>;

    /// Number of open negative reports against `subject`.
    async fn open_negative_count(&self, subject: UserId) -> Result<usize>;
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<UserId, UserAccount>,
    reports: Vec<UserRecord>,
    moderation_log: Vec<ModerationEntry>,
    next_account_id: UserId,
    next_report_id: i64,
}

/// In-process implementation of both store seams.
///
/// Used by the test suite and by embedders that run without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Snapshot of the moderation log.
    pub fn moderation_log(&self) -> Vec<ModerationEntry> {
        self.inner.read().unwrap().moderation_log.clone()
    }

    fn check_unique(
        inner: &Inner,
        account: &UserAccount,
    ) -> Result<()> {
        for other in inner.accounts.values() {
            if other.id == account.id {
                continue;
            }
            if other.name == account.name {
                return Err(ServiceError::Conflict { field: "name" });
            }
            if other.email == account.email {
                return Err(ServiceError::Conflict { field: "email" });
            }
        }
        Ok(())
    }

    fn store(inner: &mut Inner, account: &UserAccount) -> UserAccount {
        let mut account = account.clone();
        if account.id == UNSAVED {
            inner.next_account_id += 1;
            account.id = inner.next_account_id;
        }
        inner.accounts.insert(account.id, account.clone());
        account
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn load(&self, id: UserId) -> Result<UserAccount> {
        self.inner
            .read()
            .unwrap()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn save(&self, account: &UserAccount) -> Result<UserAccount> {
        let mut inner = self.inner.write().unwrap();
        Self::check_unique(&inner, account)?;
        Ok(Self::store(&mut inner, account))
    }

    async fn save_pair(
        &self,
        first: &UserAccount,
        second: &UserAccount,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        Self::check_unique(&inner, first)?;
        Self::check_unique(&inner, second)?;
        Self::store(&mut inner, first);
        Self::store(&mut inner, second);
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<UserAccount>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .accounts
            .values()
            .find(|account| account.name == name)
            .cloned())
    }

    async fn find_by_name_and_email(
        &self,
        name: &str,
        email: &str,
    ) -> Result<Option<UserAccount>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .accounts
            .values()
            .find(|account| account.name == name && account.email == email)
            .cloned())
    }

    async fn append_moderation_entry(
        &self,
        entry: &ModerationEntry,
    ) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .moderation_log
            .push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn file(
        &self,
        subject: UserId,
        is_positive: bool,
        body: &str,
        reported_by: UserId,
    ) -> Result<UserRecord> {
        let mut inner = self.inner.write().unwrap();
        inner.next_report_id += 1;

        let record = UserRecord {
            id: inner.next_report_id,
            subject_user_id: subject,
            is_positive,
            body: body.to_owned(),
            reported_by,
            resolved_at: None,
            created_at: chrono::Utc::now().date_naive(),
        };
        inner.reports.push(record.clone());
        Ok(record)
    }

    async fn resolve(&self, report_id: i64) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let record = inner
            .reports
            .iter_mut()
            .find(|record| record.id == report_id)
            .ok_or(ServiceError::NotFound)?;

        record.resolved_at = Some(chrono::Utc::now().date_naive());
        Ok(())
    }

    async fn open_negative_count(&self, subject: UserId) -> Result<usize> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .reports
            .iter()
            .filter(|record| {
                record.subject_user_id == subject
                    && !record.is_positive
                    && record.resolved_at.is_none()
            })
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, email: &str) -> UserAccount {
        UserAccount {
            name: name.to_owned(),
            email: email.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let store = MemoryStore::default();

        let bob = store.save(&account("bob", "bob@a.net")).await.unwrap();
        let mog = store.save(&account("mog", "mog@a.net")).await.unwrap();

        assert_ne!(bob.id, UNSAVED);
        assert_ne!(bob.id, mog.id);
        assert_eq!(store.load(bob.id).await.unwrap().name, "bob");
    }

    #[tokio::test]
    async fn test_unique_name_and_email() {
        let store = MemoryStore::default();
        store.save(&account("bob", "bob@a.net")).await.unwrap();

        let err = store
            .save(&account("bob", "other@a.net"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict { field: "name" }
        ));

        let err = store
            .save(&account("carl", "bob@a.net"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict { field: "email" }
        ));
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_identity() {
        let store = MemoryStore::default();
        let mut bob =
            store.save(&account("bob", "bob@a.net")).await.unwrap();

        bob.receive_dmails = true;
        let saved = store.save(&bob).await.unwrap();

        assert_eq!(saved.id, bob.id);
        assert!(store.load(bob.id).await.unwrap().receive_dmails);
    }

    #[tokio::test]
    async fn test_save_pair_is_all_or_nothing() {
        let store = MemoryStore::default();
        let mut bob =
            store.save(&account("bob", "bob@a.net")).await.unwrap();
        let mut mog =
            store.save(&account("mog", "mog@a.net")).await.unwrap();

        bob.invite_count = 9;
        mog.name = "bob".into(); // collides

        let err = store.save_pair(&bob, &mog).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));

        // Neither write landed.
        assert_eq!(store.load(bob.id).await.unwrap().invite_count, 0);
        assert_eq!(store.load(mog.id).await.unwrap().name, "mog");
    }

    #[tokio::test]
    async fn test_find_by_name_and_email() {
        let store = MemoryStore::default();
        store.save(&account("bob", "bob@a.net")).await.unwrap();

        assert!(
            store
                .find_by_name_and_email("bob", "bob@a.net")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find_by_name_and_email("bob", "wrong@a.net")
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_name("bob").await.unwrap().is_some());
        assert!(store.find_by_name("carl").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_lifecycle() {
        let store = MemoryStore::default();

        let report = store.file(4, false, "bad", 1).await.unwrap();
        store.file(4, true, "good", 1).await.unwrap();
        assert_eq!(store.open_negative_count(4).await.unwrap(), 1);

        store.resolve(report.id).await.unwrap();
        assert_eq!(store.open_negative_count(4).await.unwrap(), 0);

        let err = store.resolve(404).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_moderation_log_appends() {
        let store = MemoryStore::default();
        let entry = ModerationEntry {
            target_user_id: 4,
            moderator_id: 1,
            reason: "bad".into(),
            duration_days: 5,
            created_at: chrono::Utc::now().date_naive(),
        };

        store.append_moderation_entry(&entry).await.unwrap();
        assert_eq!(store.moderation_log(), vec![entry]);
    }
}
