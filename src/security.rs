//! Password hash primitive used by the credential verifier.
//! Hashes are PHC strings owned by the user store; this crate only compares them.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Well-formed Argon2id PHC string with the default cost parameters. Checked against when
/// no user matches, so that path costs as much as a wrong password.
pub const DECOY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Black-box `verify(plaintext, hash) -> bool`.
pub trait PasswordCheck: Send + Sync {
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Argon2 verification over PHC-encoded hashes. Parameters come from the hash itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Check;

impl PasswordCheck for Argon2Check {
    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok()
        } else { false }
    }
}

/// Produce a PHC hash with the given hasher. Used to seed user stores and fixtures.
pub fn hash_password_with(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}
