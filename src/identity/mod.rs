//! Credential verification and session identity for the gateway.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod request_context;

pub use principal::{User, Profile};
pub use session::{Session, SessionError, SessionManager, SessionToken};
pub use provider::{AuthFailure, DirectoryVerifier, LoginRequest, Verifier};
pub use request_context::{AuthState, RequestContext, Subject};
