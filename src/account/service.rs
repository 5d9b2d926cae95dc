//! Account lifecycle orchestration.
//!
//! Registration, authentication, invite promotion, moderation and password
//! recovery. Every mutation of an account serializes through a per-account
//! lock, so check-then-act sequences on one record are linearizable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use validator::Validate;

use crate::ServiceError;
use crate::account::{
    AccountStore, Identity, ModerationEntry, ReportStore, RequestContext,
    UNSAVED, UserAccount, UserId,
};
use crate::config::Configuration;
use crate::credential::CredentialStore;
use crate::error::Result;
use crate::invite::InviteLedger;
use crate::notifier::Notifier;
use crate::policy::{Level, TrustLevelPolicy, TrustLevels};

/// Registration input.
#[derive(Debug, Deserialize, Validate)]
pub struct Registration {
    #[validate(
        length(min = 2, max = 32),
        custom(
            function = "crate::account::validate_name",
            message = "Name must be alphanumeric."
        )
    )]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 5,
        max = 255,
        message = "Password must contain at least 5 characters."
    ))]
    pub password: String,
    pub confirmation: String,
}

/// Self-service profile update.
///
/// Only the whitelisted fields are ever applied. `invite_count` and `level`
/// are accepted in the payload and dropped without an error.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email(message = "Email must be formatted."))]
    pub email: Option<String>,
    pub receive_dmails: Option<bool>,
    pub invite_count: Option<i32>,
    pub level: Option<Level>,
}

#[derive(Default)]
struct AccountLocks {
    inner: StdMutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    fn handle(&self, id: UserId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        Arc::clone(map.entry(id).or_default())
    }

    async fn acquire(&self, id: UserId) -> OwnedMutexGuard<()> {
        self.handle(id).lock_owned().await
    }

    /// Lock two accounts in id order.
    async fn acquire_pair(
        &self,
        a: UserId,
        b: UserId,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if a == b {
            (self.acquire(a).await, None)
        } else {
            let (first, second) = if a < b { (a, b) } else { (b, a) };
            (self.acquire(first).await, Some(self.acquire(second).await))
        }
    }
}

/// Orchestrates the account state machine over the store, policy, ledger
/// and notifier.
pub struct AccountLifecycleService<S, R, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    policy: Arc<TrustLevelPolicy>,
    credentials: CredentialStore,
    ledger: InviteLedger<R>,
    locks: AccountLocks,
}

impl<S, R, N> AccountLifecycleService<S, R, N>
where
    S: AccountStore,
    R: ReportStore,
    N: Notifier,
{
    /// Create a new [`AccountLifecycleService`] from the process
    /// configuration and the host's collaborators.
    pub fn new(
        config: &Configuration,
        store: Arc<S>,
        reports: Arc<R>,
        notifier: Arc<N>,
    ) -> Result<Self> {
        let levels = TrustLevels::from_map(&config.user_levels)?;
        let policy = Arc::new(TrustLevelPolicy::new(levels));
        let credentials = CredentialStore::new(
            config.argon2.clone(),
            config.generated_password_length,
        )?;
        let ledger = InviteLedger::new(Arc::clone(&policy), reports);

        Ok(Self {
            store,
            notifier,
            policy,
            credentials,
            ledger,
            locks: AccountLocks::default(),
        })
    }

    /// Create an account at the entry level.
    ///
    /// The welcome notice is best-effort and never fails the registration.
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<UserAccount> {
        registration.validate()?;

        let credential = self.credentials.set_password(
            &registration.password,
            &registration.confirmation,
        )?;

        let account = UserAccount {
            id: UNSAVED,
            name: registration.name,
            email: registration.email,
            credential,
            level: self.policy.levels().member(),
            invite_count: 0,
            receive_dmails: false,
            created_at: chrono::Utc::now().date_naive(),
        };
        let account = self.store.save(&account).await?;

        if let Err(err) = self.notifier.send_welcome(&account).await {
            tracing::error!(
                user_id = account.id,
                error = %err,
                "welcome notice not delivered"
            );
        }

        tracing::info!(user_id = account.id, "account registered");
        Ok(account)
    }

    /// Open a session for a name and password pair.
    ///
    /// Any failure yields [`Identity::Anonymous`]; the caller is never told
    /// whether the name or the password was wrong.
    pub async fn authenticate(&self, name: &str, password: &str) -> Identity {
        match self.store.find_by_name(name).await {
            Ok(Some(account))
                if self
                    .credentials
                    .verify(password, &account.credential) =>
            {
                tracing::debug!(user_id = account.id, "session opened");
                Identity::Authenticated(account)
            },
            Ok(_) => Identity::Anonymous,
            Err(err) => {
                tracing::debug!(error = %err, "login lookup failed");
                Identity::Anonymous
            },
        }
    }

    /// Raise `target_id` to `requested` by spending one of the actor's
    /// invites.
    ///
    /// Both accounts commit together. Every failure surfaces as the same
    /// [`ServiceError::PromotionDenied`] and leaves the target untouched.
    pub async fn promote(
        &self,
        ctx: &RequestContext,
        target_id: UserId,
        requested: Level,
    ) -> Result<()> {
        let Some(acting_id) = ctx.acting_user_id else {
            return Err(ServiceError::PromotionDenied);
        };

        let _guards = self.locks.acquire_pair(acting_id, target_id).await;

        let mut actor = self
            .store
            .load(acting_id)
            .await
            .map_err(|_| ServiceError::PromotionDenied)?;
        let mut target = self
            .store
            .load(target_id)
            .await
            .map_err(|_| ServiceError::PromotionDenied)?;

        if !self.policy.can_promote(&actor, &target, requested) {
            return Err(ServiceError::PromotionDenied);
        }
        self.ledger
            .consume(&mut actor)
            .await
            .map_err(|_| ServiceError::PromotionDenied)?;

        if actor.id == target.id {
            actor.level = requested;
            self.store
                .save(&actor)
                .await
                .map_err(|_| ServiceError::PromotionDenied)?;
        } else {
            target.level = requested;
            self.store
                .save_pair(&actor, &target)
                .await
                .map_err(|_| ServiceError::PromotionDenied)?;
        }

        tracing::info!(
            actor_id = actor.id,
            target_id,
            level = requested.0,
            "account promoted"
        );
        Ok(())
    }

    /// Apply a self-service profile update for the acting account.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        update: ProfileUpdate,
    ) -> Result<UserAccount> {
        let Some(acting_id) = ctx.acting_user_id else {
            return Err(ServiceError::Forbidden);
        };
        update.validate()?;

        let _guard = self.locks.acquire(acting_id).await;
        let mut account = self
            .store
            .load(acting_id)
            .await
            .map_err(|_| ServiceError::Forbidden)?;

        if let Some(email) = update.email {
            account.email = email;
        }
        if let Some(receive_dmails) = update.receive_dmails {
            account.receive_dmails = receive_dmails;
        }
        // `invite_count` and `level` are not self-service fields.

        self.store.save(&account).await
    }

    /// Block an account, logging reason and duration.
    pub async fn block(
        &self,
        ctx: &RequestContext,
        target_id: UserId,
        reason: &str,
        duration_days: u32,
    ) -> Result<()> {
        let moderator = self.require_moderator(ctx).await?;

        let _guard = self.locks.acquire(target_id).await;
        let mut target = self.store.load(target_id).await?;
        target.level = self.policy.levels().blocked();
        let target = self.store.save(&target).await?;

        let entry = ModerationEntry {
            target_user_id: target.id,
            moderator_id: moderator.id,
            reason: reason.to_owned(),
            duration_days,
            created_at: chrono::Utc::now().date_naive(),
        };
        self.store.append_moderation_entry(&entry).await?;

        if let Err(err) =
            self.notifier.send_moderation_notice(&target, reason).await
        {
            tracing::error!(
                user_id = target.id,
                error = %err,
                "moderation notice not delivered"
            );
        }

        tracing::info!(
            target_id = target.id,
            moderator_id = moderator.id,
            duration_days,
            "account blocked"
        );
        Ok(())
    }

    /// Lift a block.
    ///
    /// The account returns to the entry level; whatever it held before the
    /// block is not restored.
    pub async fn unblock(
        &self,
        ctx: &RequestContext,
        target_id: UserId,
    ) -> Result<()> {
        let moderator = self.require_moderator(ctx).await?;

        let _guard = self.locks.acquire(target_id).await;
        let mut target = self.store.load(target_id).await?;
        target.level = self.policy.levels().member();
        self.store.save(&target).await?;

        tracing::info!(
            target_id,
            moderator_id = moderator.id,
            "account unblocked"
        );
        Ok(())
    }

    /// Regenerate the credential for a matching name and email pair and
    /// hand the new password to the notifier.
    ///
    /// Constant-shape: the response carries no hint of whether the pair
    /// matched. Only the matching branch writes.
    pub async fn request_password_reset(&self, name: &str, email: &str) {
        let found =
            match self.store.find_by_name_and_email(name, email).await {
                Ok(Some(account)) => account,
                Ok(None) => {
                    tracing::debug!(
                        name,
                        "password reset requested for unknown pair"
                    );
                    return;
                },
                Err(err) => {
                    tracing::error!(error = %err, "password reset lookup failed");
                    return;
                },
            };

        let _guard = self.locks.acquire(found.id).await;
        let mut account = match self.store.load(found.id).await {
            Ok(account) => account,
            Err(err) => {
                tracing::error!(error = %err, "password reset reload failed");
                return;
            },
        };

        let new = match self.credentials.reset() {
            Ok(new) => new,
            Err(err) => {
                tracing::error!(error = %err, "credential regeneration failed");
                return;
            },
        };
        account.credential = new.credential;

        match self.store.save(&account).await {
            Ok(account) => {
                if let Err(err) = self
                    .notifier
                    .send_password_reset(&account, &new.plaintext)
                    .await
                {
                    tracing::error!(
                        user_id = account.id,
                        error = %err,
                        "password reset notice not delivered"
                    );
                }
            },
            Err(err) => {
                tracing::error!(
                    user_id = account.id,
                    error = %err,
                    "password reset not saved"
                );
            },
        }
    }

    async fn require_moderator(
        &self,
        ctx: &RequestContext,
    ) -> Result<UserAccount> {
        let Some(acting_id) = ctx.acting_user_id else {
            return Err(ServiceError::Forbidden);
        };
        let actor = self
            .store
            .load(acting_id)
            .await
            .map_err(|_| ServiceError::Forbidden)?;

        if actor.level < self.policy.levels().moderator() {
            return Err(ServiceError::Forbidden);
        }
        Ok(actor)
    }
}
