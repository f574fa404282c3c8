//! Authentication gate.
//!
//! `session_layer` runs on every request: it resolves the session cookie against the
//! session store, issuing a fresh anonymous session (and cookie) when the presented token
//! is missing, unknown or expired. `require_auth` is the single precondition placed in
//! front of every gated route.

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use super::{parse_cookie, session_cookie, AppState, SESSION_COOKIE};
use crate::error::AppError;
use crate::identity::{RequestContext, Subject};

pub async fn session_layer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let existing = match parse_cookie(req.headers(), SESSION_COOKIE) {
        Some(token) => state.sessions.lookup(&token).await,
        None => None,
    };
    let (ctx, fresh) = match existing {
        Some(session) => (RequestContext::from(session), false),
        None => match state.sessions.issue().await {
            Ok(session) => (RequestContext::from(session), true),
            Err(e) => {
                error!(target: "faregate::session", "failed to issue session: {e}");
                return AppError::from(e).into_response();
            }
        },
    };
    let token = ctx.token.clone();
    req.extensions_mut().insert(ctx);

    let mut resp = next.run(req).await;
    if fresh {
        if let Some(cookie) = session_cookie(&token, state.cookie_secure) {
            resp.headers_mut().append(SET_COOKIE, cookie);
        }
    }
    resp
}

/// Short-circuit with 401 unless the session is authenticated; otherwise expose the
/// subject to the handler as a `Subject` extension.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let subject = req.extensions().get::<RequestContext>().and_then(|c| c.subject().map(str::to_owned));
    let Some(subject) = subject else {
        debug!(target: "faregate::auth", path = %req.uri().path(), "rejected unauthenticated request");
        return Err(AppError::unauthenticated());
    };
    req.extensions_mut().insert(Subject(subject));
    Ok(next.run(req).await)
}
