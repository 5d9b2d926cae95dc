//! Error handler for warden.

use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Enum representing account lifecycle errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("password and confirmation do not match")]
    Mismatch,

    #[error("`{field}` is already taken")]
    Conflict { field: &'static str },

    /// Uniform denial. The caller is not told whether the privilege, the
    /// invite allowance, or an open report caused it.
    #[error("promotion denied")]
    PromotionDenied,

    #[error("no invite available")]
    InsufficientInvite,

    #[error("operation forbidden")]
    Forbidden,

    #[error("no such account")]
    NotFound,

    #[error(transparent)]
    Credential(#[from] crate::credential::CredentialError),

    #[error(transparent)]
    Policy(#[from] crate::policy::PolicyError),
}
