//! Trust level ordering and promotion rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::account::UserAccount;

const BLOCKED: &str = "Blocked";
const MEMBER: &str = "Member";
const MODERATOR: &str = "Moderator";

#[derive(thiserror::Error, Debug)]
pub enum PolicyError {
    #[error("missing `{0}` entry in the configured trust levels")]
    MissingLevel(&'static str),
}

/// Rank on the trust ladder.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Level(pub i32);

/// Named ranks loaded from configuration.
///
/// Built once at startup, immutable for the process lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct TrustLevels {
    ladder: BTreeMap<String, Level>,
    blocked: Level,
    member: Level,
    moderator: Level,
}

impl TrustLevels {
    /// Build the ladder from the configured name to rank mapping.
    ///
    /// `Blocked`, `Member` and `Moderator` anchor the lifecycle rules and
    /// must be present.
    pub fn from_map(
        map: &BTreeMap<String, i32>,
    ) -> Result<Self, PolicyError> {
        let ladder: BTreeMap<String, Level> = map
            .iter()
            .map(|(name, rank)| (name.clone(), Level(*rank)))
            .collect();

        let anchor = |name: &'static str| {
            ladder
                .get(name)
                .copied()
                .ok_or(PolicyError::MissingLevel(name))
        };
        let blocked = anchor(BLOCKED)?;
        let member = anchor(MEMBER)?;
        let moderator = anchor(MODERATOR)?;

        Ok(Self {
            ladder,
            blocked,
            member,
            moderator,
        })
    }

    /// Rank for a configured level name.
    pub fn get(&self, name: &str) -> Option<Level> {
        self.ladder.get(name).copied()
    }

    /// Whether `level` is part of the configured set.
    pub fn contains(&self, level: Level) -> bool {
        self.ladder.values().any(|rank| *rank == level)
    }

    /// Name of a configured rank.
    pub fn name_of(&self, level: Level) -> Option<&str> {
        self.ladder
            .iter()
            .find(|(_, rank)| **rank == level)
            .map(|(name, _)| name.as_str())
    }

    pub fn blocked(&self) -> Level {
        self.blocked
    }

    pub fn member(&self) -> Level {
        self.member
    }

    pub fn moderator(&self) -> Level {
        self.moderator
    }
}

/// Decides which level transitions are legal.
#[derive(Clone, Debug)]
pub struct TrustLevelPolicy {
    levels: TrustLevels,
}

impl TrustLevelPolicy {
    /// Create a new [`TrustLevelPolicy`].
    pub fn new(levels: TrustLevels) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &TrustLevels {
        &self.levels
    }

    /// Whether `actor` may raise `target` to `requested`.
    ///
    /// Pure check on ranks only; the invite allowance is the ledger's
    /// concern.
    pub fn can_promote(
        &self,
        actor: &UserAccount,
        target: &UserAccount,
        requested: Level,
    ) -> bool {
        self.levels.contains(requested)
            && requested > self.levels.member()
            && target.level < requested
            && actor.level >= self.levels.moderator()
    }

    /// Whether an account is ranked high enough to hold invites.
    pub fn may_hold_invites(&self, account: &UserAccount) -> bool {
        account.level >= self.levels.moderator()
    }
}
