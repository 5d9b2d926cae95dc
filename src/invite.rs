//! Invite allowance tracking and consumption.

use std::sync::Arc;

use crate::ServiceError;
use crate::account::{ReportStore, UserAccount};
use crate::error::Result;
use crate::policy::TrustLevelPolicy;

/// Tracks whether an account may spend an invite, and spends it.
#[derive(Clone)]
pub struct InviteLedger<R> {
    policy: Arc<TrustLevelPolicy>,
    reports: Arc<R>,
}

impl<R: ReportStore> InviteLedger<R> {
    /// Create a new [`InviteLedger`].
    pub fn new(policy: Arc<TrustLevelPolicy>, reports: Arc<R>) -> Self {
        Self { policy, reports }
    }

    /// Whether `account` currently holds a spendable invite.
    ///
    /// An open negative report suspends the allowance even when the
    /// counter is positive.
    pub async fn has_available_invite(
        &self,
        account: &UserAccount,
    ) -> Result<bool> {
        if account.invite_count <= 0
            || !self.policy.may_hold_invites(account)
        {
            return Ok(false);
        }

        let open_reports =
            self.reports.open_negative_count(account.id).await?;
        Ok(open_reports == 0)
    }

    /// Spend one invite unit.
    ///
    /// No partial effect: on failure the counter is untouched.
    pub async fn consume(&self, account: &mut UserAccount) -> Result<()> {
        if !self.has_available_invite(account).await? {
            return Err(ServiceError::InsufficientInvite);
        }

        account.invite_count -= 1;
        Ok(())
    }
}
