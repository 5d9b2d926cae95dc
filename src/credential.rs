//! Password hashing, verification and recovery.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::ServiceError;
use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CredentialError>;

#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// Salted Argon2id hash in PHC string format.
///
/// The plaintext it was derived from is never retained.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    /// PHC string as stored.
    pub fn phc(&self) -> &str {
        &self.0
    }
}

/// Result of a password reset.
///
/// `plaintext` only exists to be handed to the notifier and is wiped
/// on drop.
pub struct NewCredential {
    pub credential: Credential,
    pub plaintext: Zeroizing<String>,
}

/// Derives, verifies and regenerates account credentials with Argon2id.
pub struct CredentialStore {
    params: Params,
    generated_length: usize,
}

impl CredentialStore {
    /// Create a new [`CredentialStore`].
    pub fn new(
        config: Option<ArgonConfig>,
        generated_length: usize,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CredentialError::Argon2(err.to_string()))?;

        Ok(Self {
            params,
            generated_length,
        })
    }

    /// Derive a [`Credential`] after checking the confirmation copy.
    pub fn set_password(
        &self,
        password: impl AsRef<[u8]>,
        confirmation: impl AsRef<[u8]>,
    ) -> crate::error::Result<Credential> {
        if password.as_ref() != confirmation.as_ref() {
            return Err(ServiceError::Mismatch);
        }

        Ok(self.hash(password)?)
    }

    /// Verify a password against a stored [`Credential`].
    pub fn verify(
        &self,
        password: impl AsRef<[u8]>,
        credential: &Credential,
    ) -> bool {
        let Ok(parsed) = PasswordHash::new(credential.phc()) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_ref(), &parsed)
            .is_ok()
    }

    /// Replace a credential with a freshly generated one.
    ///
    /// Hash and salt are both regenerated, so the previous hash cannot be
    /// reproduced from the new one.
    pub fn reset(&self) -> Result<NewCredential> {
        let plaintext = Zeroizing::new(
            Alphanumeric.sample_string(&mut OsRng, self.generated_length),
        );
        let credential = self.hash(plaintext.as_bytes())?;

        Ok(NewCredential {
            credential,
            plaintext,
        })
    }

    fn argon2(&self) -> Argon2 {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a password using Argon2id with a random salt.
    fn hash(&self, password: impl AsRef<[u8]>) -> Result<Credential> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_ref(), &salt)
            .map_err(|e| CredentialError::Argon2(e.to_string()))?;

        Ok(Credential(hash.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> CredentialStore {
    // Cheap parameters, hashing strength is not under test.
    let config = ArgonConfig {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    };
    CredentialStore::new(Some(config), 12).expect("valid argon2 parameters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_verify() {
        let store = test_store();

        let credential = store.set_password("zugzug1", "zugzug1").unwrap();
        assert!(store.verify("zugzug1", &credential));
        assert!(!store.verify("zugzug2", &credential));
    }

    #[test]
    fn test_confirmation_mismatch() {
        let store = test_store();

        let err = store.set_password("zugzug1", "zugzug2").unwrap_err();
        assert!(matches!(err, ServiceError::Mismatch));
    }

    #[test]
    fn test_reset_discards_old_hash() {
        let store = test_store();

        let old = store.set_password("zugzug1", "zugzug1").unwrap();
        let new = store.reset().unwrap();

        assert_ne!(old.phc(), new.credential.phc());
        assert!(store.verify(new.plaintext.as_bytes(), &new.credential));
        assert!(!store.verify("zugzug1", &new.credential));
    }

    #[test]
    fn test_generated_password_length() {
        let store = test_store();

        let new = store.reset().unwrap();
        assert_eq!(new.plaintext.len(), 12);
    }
}
