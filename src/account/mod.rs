//! Account aggregate and the entities hanging off it.

mod repository;
mod service;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::credential::Credential;
use crate::policy::Level;

/// Opaque account identifier, assigned by the store.
pub type UserId = i64;

/// User as saved on database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    #[serde(skip)]
    pub email: String,
    #[serde(skip)]
    pub credential: Credential,
    pub level: Level,
    pub invite_count: i32,
    pub receive_dmails: bool,
    pub created_at: chrono::NaiveDate,
}

/// Session identity: a logged-in account, or the anonymous fallback used
/// whenever authentication has not succeeded.
#[derive(Clone, Debug, PartialEq)]
pub enum Identity {
    Authenticated(UserAccount),
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// Account behind the session, if any.
    pub fn account(&self) -> Option<&UserAccount> {
        match self {
            Identity::Authenticated(account) => Some(account),
            Identity::Anonymous => None,
        }
    }
}

/// Behavioral report filed by one account against another.
///
/// An open negative report suspends the subject's invite privileges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub subject_user_id: UserId,
    pub is_positive: bool,
    pub body: String,
    pub reported_by: UserId,
    pub resolved_at: Option<chrono::NaiveDate>,
    pub created_at: chrono::NaiveDate,
}

/// Moderation log entry written when an account is blocked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModerationEntry {
    pub target_user_id: UserId,
    pub moderator_id: UserId,
    pub reason: String,
    pub duration_days: u32,
    pub created_at: chrono::NaiveDate,
}

/// Acting identity supplied by the host per request.
///
/// `None` means the request is anonymous. The core never parses HTTP.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContext {
    pub acting_user_id: Option<UserId>,
}

impl RequestContext {
    /// Context for a logged-in account.
    pub fn acting_as(id: UserId) -> Self {
        Self {
            acting_user_id: Some(id),
        }
    }

    /// Context without a backing session.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

pub(crate) fn validate_name(
    name: &str,
) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_variants() {
        let account = UserAccount {
            name: "bob".into(),
            ..Default::default()
        };

        let session = Identity::Authenticated(account.clone());
        assert!(!session.is_anonymous());
        assert_eq!(session.account(), Some(&account));

        assert!(Identity::Anonymous.is_anonymous());
        assert_eq!(Identity::Anonymous.account(), None);
    }

    #[test]
    fn test_serialized_account_hides_secrets() {
        let account = UserAccount {
            id: 1,
            name: "bob".into(),
            email: "bob@a.net".into(),
            ..Default::default()
        };

        let json = serde_json::to_value(&account).expect("serializable");
        assert_eq!(json["name"], "bob");
        assert!(json.get("email").is_none());
        assert!(json.get("credential").is_none());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("bob_42").is_ok());
        assert!(validate_name("bob the builder").is_err());
        assert!(validate_name("bob@net").is_err());
    }
}
