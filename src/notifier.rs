//! Outbound notifications for important account updates.
//!
//! Delivery is best-effort: the lifecycle service logs failures and never
//! rolls back a committed state change because a notice was lost.

use async_trait::async_trait;

use crate::account::UserAccount;
use crate::error::Result;

/// Delivery seam implemented by the host's mail (or queue) adapter.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Greet a freshly registered account.
    async fn send_welcome(&self, account: &UserAccount) -> Result<()>;

    /// Hand a generated password to the account owner.
    async fn send_password_reset(
        &self,
        account: &UserAccount,
        new_password: &str,
    ) -> Result<()>;

    /// Tell an account it was moderated, and why.
    async fn send_moderation_notice(
        &self,
        account: &UserAccount,
        reason: &str,
    ) -> Result<()>;
}

/// Notifier that drops every message.
///
/// Default for embedders that wire no mail adapter.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_welcome(&self, account: &UserAccount) -> Result<()> {
        tracing::debug!(user_id = account.id, "welcome notice dropped");
        Ok(())
    }

    async fn send_password_reset(
        &self,
        account: &UserAccount,
        _new_password: &str,
    ) -> Result<()> {
        tracing::debug!(
            user_id = account.id,
            "password reset notice dropped"
        );
        Ok(())
    }

    async fn send_moderation_notice(
        &self,
        account: &UserAccount,
        reason: &str,
    ) -> Result<()> {
        tracing::debug!(
            user_id = account.id,
            reason,
            "moderation notice dropped"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::ServiceError;
    use crate::account::UserId;

    /// What a [`RecordingNotifier`] saw.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Event {
        Welcome(UserId),
        PasswordReset(UserId, String),
        ModerationNotice(UserId, String),
    }

    /// Notifier that remembers every delivery for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingNotifier {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_welcome(&self, account: &UserAccount) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(Event::Welcome(account.id));
            Ok(())
        }

        async fn send_password_reset(
            &self,
            account: &UserAccount,
            new_password: &str,
        ) -> Result<()> {
            self.events.lock().unwrap().push(Event::PasswordReset(
                account.id,
                new_password.to_owned(),
            ));
            Ok(())
        }

        async fn send_moderation_notice(
            &self,
            account: &UserAccount,
            reason: &str,
        ) -> Result<()> {
            self.events.lock().unwrap().push(Event::ModerationNotice(
                account.id,
                reason.to_owned(),
            ));
            Ok(())
        }
    }

    /// Notifier whose deliveries always fail.
    #[derive(Debug, Default)]
    pub struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_welcome(&self, _: &UserAccount) -> Result<()> {
            Err(ServiceError::NotFound)
        }

        async fn send_password_reset(
            &self,
            _: &UserAccount,
            _: &str,
        ) -> Result<()> {
            Err(ServiceError::NotFound)
        }

        async fn send_moderation_notice(
            &self,
            _: &UserAccount,
            _: &str,
        ) -> Result<()> {
            Err(ServiceError::NotFound)
        }
    }
}
