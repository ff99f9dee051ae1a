use crate::config::HashingConfig;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, PasswordVerifier, Version,
};
use sha2::{Digest, Sha256};

/// Longest slice of a stored hash ever shown to an operator.
pub const HASH_PREVIEW_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid work factor: {0}")]
    InvalidParams(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id hashing with an explicit work factor.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("CredentialHasher")
            .field("m_cost", &params.m_cost())
            .field("t_cost", &params.t_cost())
            .field("p_cost", &params.p_cost())
            .finish()
    }
}

impl CredentialHasher {
    pub fn new(config: &HashingConfig) -> Result<Self, CredentialError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Verification reads the parameters embedded in the stored hash, so
    /// hashes written under an older work factor still validate.
    pub fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
            self.argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        } else {
            false
        }
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

/// Bounded display prefix of a stored hash. A hash no longer than the bound
/// is cut to half its length so the full value is never echoed.
pub fn hash_preview(hash: &str) -> Option<String> {
    let len = hash.chars().count();
    if len == 0 {
        return None;
    }
    let shown = if len > HASH_PREVIEW_LEN {
        HASH_PREVIEW_LEN
    } else {
        len / 2
    };
    Some(format!("{}...", hash.chars().take(shown).collect::<String>()))
}

/// Display prefix for a bearer token.
pub fn token_preview(token: &str, max_chars: usize) -> String {
    let shown: String = token.chars().take(max_chars).collect();
    format!("{}...", shown)
}

/// Session tokens are stored as their SHA-256 digest.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}
