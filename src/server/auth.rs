//! `/auth` identity check and login, `/logout`.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tracing::{error, info, warn};

use super::payload::JsonOrForm;
use super::{clear_session_cookie, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::{AuthFailure, LoginRequest, Profile, RequestContext};

/// `GET /auth`: profile of the session's user, fetched fresh from the user store.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<Profile>> {
    let Some(subject) = ctx.subject() else { return Err(AppError::unauthenticated()); };
    match state.verifier.resolve(subject).await {
        Ok(Some(user)) => Ok(Json(Profile::from(&user))),
        Ok(None) => {
            warn!(target: "faregate::auth", user = %subject, "session bound to a user the store no longer has");
            Err(AppError::unauthenticated())
        }
        Err(e) => {
            error!(target: "faregate::auth", user = %subject, "identity lookup failed: {e}");
            Err(e.into())
        }
    }
}

/// `POST /auth`: verify credentials and bind the current session to the user.
pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonOrForm(req): JsonOrForm<LoginRequest>,
) -> AppResult<Json<Profile>> {
    let user = match state.verifier.verify(&req.email, &req.password).await {
        Ok(user) => user,
        Err(AuthFailure::InvalidCredentials) => {
            info!(target: "faregate::auth", "login failed");
            return Err(AppError::invalid_credentials());
        }
        Err(e) => {
            error!(target: "faregate::auth", "login backend failure: {e}");
            return Err(e.into());
        }
    };
    state.sessions.persist(&ctx.token, &user.id).await?;
    info!(target: "faregate::auth", user = %user.id, "login succeeded");
    Ok(Json(Profile::from(&user)))
}

/// `POST /logout`: destroy the session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<impl IntoResponse> {
    state.sessions.revoke(&ctx.token).await?;
    info!(target: "faregate::auth", user = ctx.subject().unwrap_or("-"), "logged out");
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie(state.cookie_secure));
    Ok((headers, "OK"))
}
