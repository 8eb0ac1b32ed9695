//! Port for one-way credential hashing.
use crate::domain::{Password, PasswordHash};

use super::define_port_error;

define_port_error! {
    /// Errors raised while hashing.
    pub enum PasswordHasherError {
        /// The hasher could not produce an encoding.
        Hash { message: String } => "credential hashing failed: {message}",
    }
}

/// Salted one-way hashing of passwords and refresh credentials.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a fresh salt.
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHasherError>;

    /// Check `password` against a stored hash in constant time.
    fn verify(&self, password: &Password, hash: &PasswordHash) -> bool;
}
