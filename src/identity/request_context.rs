use super::session::{Session, SessionToken};

/// Outcome of resolving a request's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(String),
}

/// Per-request session view, inserted as a request extension by the session layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub token: SessionToken,
    pub state: AuthState,
}

impl RequestContext {
    pub fn subject(&self) -> Option<&str> {
        match &self.state {
            AuthState::Authenticated(s) => Some(s.as_str()),
            AuthState::Anonymous => None,
        }
    }
}

impl From<Session> for RequestContext {
    fn from(s: Session) -> Self {
        let state = match s.subject {
            Some(subject) => AuthState::Authenticated(subject),
            None => AuthState::Anonymous,
        };
        Self { token: s.token, state }
    }
}

/// Authenticated user id, present only on requests that passed `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);
