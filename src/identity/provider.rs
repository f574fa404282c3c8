use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::principal::User;
use crate::security::{PasswordCheck, DECOY_HASH};
use crate::upstream::{UpstreamError, UserDirectory};

/// Credentials submitted to `POST /auth`, as JSON or a urlencoded form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user store unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
    #[error("credential check failed: {0}")]
    Internal(String),
}

/// Capability handed to the authentication gate: check credentials, and turn a session
/// subject back into a user.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> Result<User, AuthFailure>;
    async fn resolve(&self, id: &str) -> Result<Option<User>, AuthFailure>;
}

/// Verifier backed by the external user store and a password hash primitive.
pub struct DirectoryVerifier {
    users: Arc<dyn UserDirectory>,
    passwords: Arc<dyn PasswordCheck>,
}

impl DirectoryVerifier {
    pub fn new(users: Arc<dyn UserDirectory>, passwords: Arc<dyn PasswordCheck>) -> Self {
        Self { users, passwords }
    }

    // Hash verification is CPU-bound; keep it off the request workers.
    async fn check_password(&self, plaintext: &str, hash: &str) -> Result<bool, AuthFailure> {
        let passwords = Arc::clone(&self.passwords);
        let (plaintext, hash) = (plaintext.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || passwords.verify(&plaintext, &hash))
            .await
            .map_err(|e| {
                error!(target: "faregate::auth", "password check aborted: {e}");
                AuthFailure::Internal(e.to_string())
            })
    }
}

#[async_trait]
impl Verifier for DirectoryVerifier {
    async fn verify(&self, email: &str, password: &str) -> Result<User, AuthFailure> {
        let mut matches = self.users.find_by_email(email).await?;
        if matches.len() > 1 {
            warn!(target: "faregate::auth", count = matches.len(), "user store returned several records for one email; using the first");
        }
        if matches.is_empty() {
            // Decoy check: an unknown email costs the same as a password mismatch.
            self.check_password(password, DECOY_HASH).await?;
            debug!(target: "faregate::auth", "login rejected: no such user");
            return Err(AuthFailure::InvalidCredentials);
        }
        let user = matches.swap_remove(0);
        if !self.check_password(password, &user.password_hash).await? {
            debug!(target: "faregate::auth", user = %user.id, "login rejected: password mismatch");
            return Err(AuthFailure::InvalidCredentials);
        }
        Ok(user)
    }

    async fn resolve(&self, id: &str) -> Result<Option<User>, AuthFailure> {
        Ok(self.users.find_by_id(id).await?)
    }
}
