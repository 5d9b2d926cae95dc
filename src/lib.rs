//! Warden is an account lifecycle and community trust manager.
//!
//! The crate owns the user state machine — registration, authentication,
//! invite-based promotion, moderation blocking and password recovery —
//! and talks to the host application through the [`account::AccountStore`],
//! [`account::ReportStore`] and [`notifier::Notifier`] seams. HTTP routing,
//! mail transport and database drivers stay on the host's side of those
//! seams.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod account;
pub mod config;
pub mod credential;
pub mod error;
pub mod invite;
pub mod notifier;
pub mod policy;
pub mod telemetry;

pub use account::{
    AccountLifecycleService, Identity, ProfileUpdate, Registration,
    RequestContext, UserAccount,
};
pub use error::ServiceError;
pub use invite::InviteLedger;
pub use notifier::{Notifier, NullNotifier};
pub use policy::{Level, TrustLevelPolicy, TrustLevels};
