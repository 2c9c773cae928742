//! Credential hashing.
//!
//! Argon2id with a random per-call salt; the PHC output string embeds salt and params.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("invalid argon2 params: {0}")]
    Params(String),
}

// Well-formed PHC string with default params. Verified against when the account does not
// exist so both login failure paths cost one argon2 run.
const DECOY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQxMjM0NTY3OA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl CredentialHasher {
    /// Custom argon2id cost (memory KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Constant-time check. Never errors: mismatch and unparsable hashes both return false.
    pub fn verify(&self, hashed: &str, candidate: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => self
                .argon2
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn verify_decoy(&self, candidate: &str) {
        let _ = self.verify(DECOY_HASH, candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> CredentialHasher {
        CredentialHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let hasher = fast();
        let hash = hasher.hash("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "correct horse battery"));
        assert!(!hasher.verify(&hash, "correct horse battery!"));
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        let hasher = fast();
        let h1 = hasher.hash("Password1").unwrap();
        let h2 = hasher.hash("Password1").unwrap();

        assert_ne!(h1, h2);
        assert!(hasher.verify(&h1, "Password1"));
        assert!(hasher.verify(&h2, "Password1"));
    }

    #[test]
    fn unparsable_hash_is_a_mismatch_not_an_error() {
        assert!(!fast().verify("not-a-phc-string", "anything"));
        assert!(!fast().verify("", ""));
    }

    #[test]
    fn default_params_verify_hashes_from_custom_params() {
        // params are read from the PHC string
        let hash = fast().hash("pw-12345678").unwrap();
        assert!(CredentialHasher::default().verify(&hash, "pw-12345678"));
    }

    #[test]
    fn decoy_hash_parses() {
        assert!(PasswordHash::new(DECOY_HASH).is_ok());
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(matches!(
            CredentialHasher::with_params(0, 0, 0),
            Err(PasswordError::Params(_))
        ));
    }
}
