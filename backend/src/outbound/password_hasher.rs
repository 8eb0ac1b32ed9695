//! Argon2id implementation of the `PasswordHasher` port.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=…,t=…,p=…$<salt>$<hash>`),
//! so verification reads the cost parameters from the stored value and older
//! hashes keep verifying after the configured cost changes.

use argon2::password_hash::{
    PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::domain::ports::{PasswordHasher, PasswordHasherError};
use crate::domain::{Password, PasswordHash};

const SALT_BYTES: usize = 16;

/// Argon2id hasher with a random per-credential salt.
#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2PasswordHasher {
    /// Hasher using `memory_kib` KiB of memory and `iterations` passes.
    ///
    /// # Errors
    /// Returns [`PasswordHasherError::Hash`] when argon2 rejects the costs.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, PasswordHasherError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|err| PasswordHasherError::hash(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

fn fresh_salt() -> Result<SaltString, PasswordHasherError> {
    let mut bytes = Zeroizing::new([0_u8; SALT_BYTES]);
    rand::thread_rng()
        .try_fill_bytes(bytes.as_mut_slice())
        .map_err(|err| PasswordHasherError::hash(err.to_string()))?;
    SaltString::encode_b64(bytes.as_slice()).map_err(|err| PasswordHasherError::hash(err.to_string()))
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHasherError> {
        let salt = fresh_salt()?;
        let encoded = self
            .argon2()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|err| PasswordHasherError::hash(err.to_string()))?;
        Ok(PasswordHash::new(encoded.to_string()))
    }

    fn verify(&self, password: &Password, hash: &PasswordHash) -> bool {
        let Ok(stored) = PhcString::new(hash.as_str()) else {
            return false;
        };
        self.argon2()
            .verify_password(password.expose().as_bytes(), &stored)
            .is_ok()
    }
}
