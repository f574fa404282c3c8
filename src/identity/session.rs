//! File-backed session identity store.
//!
//! Each session lives in `<dir>/<token>.json` and is mirrored in an in-memory index that
//! serves every read. The index is rebuilt from disk on `open`, so bindings survive a
//! restart. Sessions are created anonymous on first contact and bound to a subject on login.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::tprintln;

pub type SessionToken = String;

const TOKEN_BYTES: usize = 32;
// base64url without padding of TOKEN_BYTES
const TOKEN_LEN: usize = 43;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(skip)]
    pub token: SessionToken,
    #[serde(default)]
    pub subject: Option<String>,
    pub issued_at: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool { self.subject.is_some() }

    fn expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record encoding: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no entropy for session token: {0}")]
    Entropy(String),
    #[error("session no longer exists")]
    Gone,
}

pub struct SessionManager {
    dir: PathBuf,
    ttl: Option<Duration>,
    anonymous_ttl: Option<Duration>,
    index: RwLock<HashMap<SessionToken, Session>>,
}

fn now_secs() -> i64 { chrono::Utc::now().timestamp() }

fn well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn random_b64(len: usize) -> Result<String, SessionError> {
    let mut buf = vec![0u8; len];
    getrandom::getrandom(&mut buf).map_err(|e| SessionError::Entropy(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

impl SessionManager {
    /// Open (or create) the store under `dir`, loading every unexpired session on disk.
    pub fn open(dir: impl AsRef<Path>, ttl: Option<Duration>) -> Result<Self, SessionError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let now = now_secs();
        let mut map = HashMap::new();
        for ent in std::fs::read_dir(&dir)?.flatten() {
            let path = ent.path();
            let Some(token) = path.file_name().and_then(|n| n.to_str()).and_then(|n| n.strip_suffix(".json")) else { continue; };
            if !well_formed(token) { continue; }
            let parsed = std::fs::read(&path).map_err(SessionError::from).and_then(|b| serde_json::from_slice::<Session>(&b).map_err(SessionError::from));
            match parsed {
                Ok(mut s) if !s.expired(now) => {
                    s.token = token.to_string();
                    map.insert(s.token.clone(), s);
                }
                Ok(_) => { let _ = std::fs::remove_file(&path); }
                Err(e) => warn!(target: "faregate::session", path = %path.display(), "skipping unreadable session: {e}"),
            }
        }
        debug!(target: "faregate::session", dir = %dir.display(), loaded = map.len(), "session store opened");
        Ok(Self { dir, ttl, anonymous_ttl: ttl, index: RwLock::new(map) })
    }

    /// Lifetime of sessions that never log in. Defaults to the bound-session TTL.
    pub fn with_anonymous_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.anonymous_ttl = ttl;
        self
    }

    /// 256-bit random token, base64url without padding.
    pub fn create_session_id() -> Result<SessionToken, SessionError> {
        random_b64(TOKEN_BYTES)
    }

    fn path_for(&self, token: &str) -> PathBuf { self.dir.join(format!("{token}.json")) }

    fn expiry_from(now: i64, ttl: Option<Duration>) -> Option<i64> {
        ttl.map(|t| now.saturating_add(i64::try_from(t.as_secs()).unwrap_or(i64::MAX)))
    }

    // Write to a private temp file, then rename over the record so readers never see a torn file.
    async fn write_record(&self, session: &Session) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(session)?;
        let tmp = self.dir.join(format!(".{}.{}.tmp", session.token, random_b64(6)?));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(&session.token)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Create and persist a fresh anonymous session.
    pub async fn issue(&self) -> Result<Session, SessionError> {
        let now = now_secs();
        let session = Session {
            token: Self::create_session_id()?,
            subject: None,
            issued_at: now,
            expires_at: Self::expiry_from(now, self.anonymous_ttl),
        };
        self.write_record(&session).await?;
        self.index.write().insert(session.token.clone(), session.clone());
        tprintln!("session.issue ttl_secs={:?}", self.anonymous_ttl.map(|t| t.as_secs()));
        Ok(session)
    }

    /// Bind `token` to `subject` and persist the binding. The expiry restarts from now.
    /// Fails with `Gone` when the session was revoked or swept, including while the record
    /// was being written.
    pub async fn persist(&self, token: &str, subject: &str) -> Result<(), SessionError> {
        let now = now_secs();
        let Some(issued_at) = self.index.read().get(token).map(|s| s.issued_at) else {
            return Err(SessionError::Gone);
        };
        let session = Session {
            token: token.to_string(),
            subject: Some(subject.to_string()),
            issued_at,
            expires_at: Self::expiry_from(now, self.ttl),
        };
        self.write_record(&session).await?;
        {
            let mut index = self.index.write();
            if let Some(slot) = index.get_mut(token) {
                *slot = session;
                tprintln!("session.bind subject={}", subject);
                return Ok(());
            }
        }
        // Revoked during the write: the record must not outlive the revoke.
        let _ = tokio::fs::remove_file(self.path_for(token)).await;
        Err(SessionError::Gone)
    }

    /// Current state of a session. Unknown, malformed and expired tokens all resolve to `None`.
    pub async fn lookup(&self, token: &str) -> Option<Session> {
        if !well_formed(token) { return None; }
        let found = self.index.read().get(token).cloned()?;
        if found.expired(now_secs()) {
            self.forget(token).await;
            return None;
        }
        Some(found)
    }

    /// Subject bound to `token`, if the session exists and is authenticated.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        self.lookup(token).await.and_then(|s| s.subject)
    }

    /// Destroy a session. Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        if !well_formed(token) { return Ok(false); }
        let existed = self.index.write().remove(token).is_some();
        match tokio::fs::remove_file(self.path_for(token)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tprintln!("session.revoke existed={}", existed);
        Ok(existed)
    }

    /// Drop every expired session from memory and disk. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = now_secs();
        let expired: Vec<SessionToken> = self.index.read().values().filter(|s| s.expired(now)).map(|s| s.token.clone()).collect();
        for token in expired.iter() {
            self.forget(token).await;
        }
        expired.len()
    }

    async fn forget(&self, token: &str) {
        self.index.write().remove(token);
        if let Err(e) = tokio::fs::remove_file(self.path_for(token)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(target: "faregate::session", "failed to delete session record: {e}");
            }
        }
    }

    pub fn len(&self) -> usize { self.index.read().len() }

    pub fn is_empty(&self) -> bool { self.index.read().is_empty() }
}
