//! Password hashing

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    Error as HashError, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::AuthError;

/// Memory cost in KiB
const MEMORY_COST: u32 = 65536;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

/// Slow, salted one-way password hashing
///
/// Both operations are CPU-bound; async callers should run them on the
/// blocking pool.
pub trait PasswordHasher: Send + Sync {
    /// Hash a password into a self-describing string (salt included)
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check a password against a stored hash. A mismatch is `Ok(false)`;
    /// errors are reserved for hashes that cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher producing PHC strings
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self {
            params: Params::new(MEMORY_COST, TIME_COST, PARALLELISM, None)
                .unwrap_or(Params::DEFAULT),
        }
    }

    /// Hasher with explicit cost parameters
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }
}
