//! Gateway settings read from `FAREGATE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub http_port: u16,
    pub bind: String,
    /// Base URL of the data API serving `/users`, `/histories` and `/tickets`.
    pub data_api_url: String,
    pub sales_api_url: String,
    pub sales_api_key: String,
    pub sales_api_key_header: String,
    /// The single browser origin allowed to call with credentials.
    pub allowed_origin: String,
    pub session_dir: PathBuf,
    /// `None` keeps sessions until logout.
    pub session_ttl: Option<Duration>,
    /// Lifetime of sessions that never log in. `None` keeps them until swept by hand.
    pub anonymous_session_ttl: Option<Duration>,
    /// `None` lets downstream calls wait indefinitely.
    pub upstream_timeout: Option<Duration>,
    pub cookie_secure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_port: 3030,
            bind: "0.0.0.0".to_string(),
            data_api_url: "http://localhost:3000".to_string(),
            sales_api_url: "http://localhost:3001/order".to_string(),
            sales_api_key: String::new(),
            sales_api_key_header: "x-api-key".to_string(),
            allowed_origin: "http://localhost:8080".to_string(),
            session_dir: PathBuf::from("sessions"),
            session_ttl: Some(Duration::from_secs(7 * 24 * 3600)),
            anonymous_session_ttl: Some(Duration::from_secs(24 * 3600)),
            upstream_timeout: Some(Duration::from_secs(30)),
            cookie_secure: false,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let mut c = Self::default();
        if let Some(v) = get("FAREGATE_HTTP_PORT") {
            c.http_port = v.trim().parse().map_err(|e| anyhow!("FAREGATE_HTTP_PORT={v:?}: {e}"))?;
        }
        if let Some(v) = get("FAREGATE_BIND") { c.bind = v; }
        if let Some(v) = get("FAREGATE_DATA_API_URL") { c.data_api_url = v; }
        if let Some(v) = get("FAREGATE_SALES_API_URL") { c.sales_api_url = v; }
        if let Some(v) = get("FAREGATE_SALES_API_KEY") { c.sales_api_key = v; }
        if let Some(v) = get("FAREGATE_SALES_API_KEY_HEADER") { c.sales_api_key_header = v; }
        if let Some(v) = get("FAREGATE_ALLOWED_ORIGIN") { c.allowed_origin = v; }
        if let Some(v) = get("FAREGATE_SESSION_DIR") { c.session_dir = PathBuf::from(v); }
        if let Some(v) = get("FAREGATE_SESSION_TTL_SECS") { c.session_ttl = secs_or_off("FAREGATE_SESSION_TTL_SECS", &v)?; }
        if let Some(v) = get("FAREGATE_ANONYMOUS_TTL_SECS") { c.anonymous_session_ttl = secs_or_off("FAREGATE_ANONYMOUS_TTL_SECS", &v)?; }
        if let Some(v) = get("FAREGATE_UPSTREAM_TIMEOUT_SECS") { c.upstream_timeout = secs_or_off("FAREGATE_UPSTREAM_TIMEOUT_SECS", &v)?; }
        if let Some(v) = get("FAREGATE_COOKIE_SECURE") { c.cookie_secure = flag("FAREGATE_COOKIE_SECURE", &v)?; }
        Ok(c)
    }
}

// 0 disables
fn secs_or_off(name: &str, v: &str) -> Result<Option<Duration>> {
    let secs: u64 = v.trim().parse().map_err(|e| anyhow!("{name}={v:?}: {e}"))?;
    Ok(if secs == 0 { None } else { Some(Duration::from_secs(secs)) })
}

fn flag(name: &str, v: &str) -> Result<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{name}={v:?}: expected a boolean")),
    }
}
