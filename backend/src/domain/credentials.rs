//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings with a random salt per call. Verification
//! compares digests in constant time, and [`CredentialStore::verify_dummy`]
//! lets callers spend the same effort when no account matches a login.

use argon2::password_hash::{
    PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::user::PasswordHash;

/// Failures raised while hashing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The configured cost parameters are rejected by Argon2.
    #[error("invalid password hashing parameters: {message}")]
    InvalidParams { message: String },
    /// Hash computation failed.
    #[error("password hashing failed: {message}")]
    Hashing { message: String },
}

/// Abstraction over the slow, salted password hash.
pub trait CredentialStore: Send + Sync {
    /// Produce a salted one-way hash of `password`.
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError>;

    /// Check `password` against `hash`. Unparseable hashes never match.
    fn verify(&self, password: &str, hash: &PasswordHash) -> bool;

    /// Run a verification against an internal hash and discard the outcome.
    ///
    /// Used when a login names an unknown account, so the elapsed time
    /// matches a real mismatch.
    fn verify_dummy(&self, password: &str);
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id-backed [`CredentialStore`].
#[derive(Clone)]
pub struct Argon2CredentialStore {
    hasher: Argon2<'static>,
    dummy: PasswordHash,
}

impl Argon2CredentialStore {
    /// Build a store with the given cost, precomputing the dummy hash.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidParams`] when Argon2 rejects the
    /// cost, or [`CredentialError::Hashing`] if the dummy hash fails.
    pub fn new(cost: HashingCost) -> Result<Self, CredentialError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|err| CredentialError::InvalidParams {
                message: err.to_string(),
            })?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut filler = Zeroizing::new([0_u8; 32]);
        OsRng.fill_bytes(filler.as_mut());
        let dummy_password = Zeroizing::new(hex::encode(filler.as_ref()));
        let dummy = hash_with(&hasher, dummy_password.as_str())?;

        Ok(Self { hasher, dummy })
    }
}

fn hash_with(hasher: &Argon2<'static>, password: &str) -> Result<PasswordHash, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| CredentialError::Hashing {
            message: err.to_string(),
        })?;
    Ok(PasswordHash::from_phc(phc.to_string()))
}

impl CredentialStore for Argon2CredentialStore {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError> {
        hash_with(&self.hasher, password)
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        let Ok(parsed) = PhcHash::new(hash.as_phc()) else {
            return false;
        };
        self.hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn verify_dummy(&self, password: &str) {
        std::hint::black_box(self.verify(password, &self.dummy));
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> Argon2CredentialStore {
        Argon2CredentialStore::new(HashingCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .expect("cheap parameters are valid")
    }

    #[rstest]
    fn hash_then_verify_matches(store: Argon2CredentialStore) {
        let hash = store.hash("correct horse").expect("hash");
        assert!(store.verify("correct horse", &hash));
        assert!(!store.verify("correct hors", &hash));
    }

    #[rstest]
    fn same_password_hashes_differently(store: Argon2CredentialStore) {
        let first = store.hash("battery staple").expect("hash");
        let second = store.hash("battery staple").expect("hash");
        assert_ne!(first, second);
        assert!(store.verify("battery staple", &first));
        assert!(store.verify("battery staple", &second));
    }

    #[rstest]
    fn hash_never_contains_plaintext(store: Argon2CredentialStore) {
        let hash = store.hash("plaintext-secret").expect("hash");
        assert!(hash.as_phc().starts_with("$argon2id$"));
        assert!(!hash.as_phc().contains("plaintext-secret"));
    }

    #[rstest]
    fn malformed_hash_never_verifies(store: Argon2CredentialStore) {
        assert!(!store.verify("anything", &PasswordHash::from_phc("not-a-phc-string")));
    }

    #[rstest]
    fn dummy_verification_completes(store: Argon2CredentialStore) {
        store.verify_dummy("whatever");
    }

    #[rstest]
    fn rejects_invalid_cost() {
        let result = Argon2CredentialStore::new(HashingCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(CredentialError::InvalidParams { .. })));
    }
}
