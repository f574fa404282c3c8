//!
//! faregate HTTP server
//! --------------------
//! Axum application fronting the user store, the history and ticket stores, and the
//! fare-sales API.
//!
//! Responsibilities:
//! - Session cookie issued on first contact, bound to a user on login.
//! - `/auth` identity check and login, `/logout`.
//! - Gated proxies: `/history`, `/tickets`, `/buyHSL`.
//! - CORS for one configured origin, request tracing, background session sweeping.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::identity::{DirectoryVerifier, SessionManager, Verifier};
use crate::security::Argon2Check;
use crate::upstream::{self, DocumentStore, HttpDataApi, HttpSalesApi, SalesApi};

pub mod auth;
pub mod fares;
pub mod gate;
pub mod history;
pub mod payload;
pub mod tickets;

pub const SESSION_COOKIE: &str = "faregate.sid";

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state injected into all handlers.
///
/// Collaborators are trait objects so the gate and handlers never know whether they talk
/// to the real services or to test doubles.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub verifier: Arc<dyn Verifier>,
    pub documents: Arc<dyn DocumentStore>,
    pub sales: Arc<dyn SalesApi>,
    /// Mark the session cookie `Secure; SameSite=None` so it rides cross-site requests.
    pub cookie_secure: bool,
}

/// Wire the real collaborators from configuration.
pub fn build_state(config: &GatewayConfig) -> anyhow::Result<AppState> {
    let sessions = SessionManager::open(&config.session_dir, config.session_ttl)
        .with_context(|| format!("While opening session store at {}", config.session_dir.display()))?
        .with_anonymous_ttl(config.anonymous_session_ttl);
    let client = upstream::build_client(config.upstream_timeout).context("While building HTTP client")?;
    let data_api = Arc::new(HttpDataApi::new(&config.data_api_url, client.clone())?);
    let sales = HttpSalesApi::new(&config.sales_api_url, &config.sales_api_key_header, &config.sales_api_key, client)?;
    let verifier = DirectoryVerifier::new(data_api.clone(), Arc::new(Argon2Check));
    Ok(AppState {
        sessions: Arc::new(sessions),
        verifier: Arc::new(verifier),
        documents: data_api,
        sales: Arc::new(sales),
        cookie_secure: config.cookie_secure,
    })
}

/// All routes behind the session layer. Gated routes share one `require_auth` precondition.
pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/history", get(history::list).post(history::append))
        .route("/tickets", get(tickets::list).post(tickets::store))
        .route("/buyHSL", post(fares::buy))
        .route("/logout", post(auth::logout))
        .route_layer(middleware::from_fn(gate::require_auth));

    Router::new()
        .route("/", get(|| async { "homepage" }))
        .route("/auth", get(auth::whoami).post(auth::login))
        .merge(gated)
        .layer(middleware::from_fn_with_state(state.clone(), gate::session_layer))
        .with_state(state)
}

/// Credentialed CORS for exactly one browser origin.
pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin).with_context(|| format!("invalid allowed origin {origin:?}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}

/// Start the gateway and serve until the listener fails.
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;

    // Background session sweeper
    if config.session_ttl.is_some() || config.anonymous_session_ttl.is_some() {
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                let removed = sessions.sweep_expired().await;
                if removed > 0 { tracing::debug!(target: "faregate::session", removed = removed, "session_sweep"); }
            }
        });
    }

    let app = router(state)
        .layer(cors_layer(&config.allowed_origin)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.bind, config.http_port).parse()?;
    info!("Starting gateway on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE) {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub(crate) fn session_cookie(token: &str, secure: bool) -> Option<HeaderValue> {
    let attrs = if secure { "HttpOnly; Secure; SameSite=None; Path=/" } else { "HttpOnly; SameSite=Lax; Path=/" };
    HeaderValue::from_str(&format!("{}={}; {}", SESSION_COOKIE, token, attrs)).ok()
}

pub(crate) fn clear_session_cookie(secure: bool) -> HeaderValue {
    let attrs = if secure { "HttpOnly; Secure; SameSite=None; Path=/" } else { "HttpOnly; SameSite=Lax; Path=/" };
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}", SESSION_COOKIE, attrs))
        .unwrap_or_else(|_| HeaderValue::from_static("faregate.sid=deleted; Max-Age=0; Path=/"))
}
