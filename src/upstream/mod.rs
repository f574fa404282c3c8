//! Clients for the services behind the gateway: the data API (users, histories,
//! tickets) and the third-party fare-sales API.
//! Handlers only see the traits below; the HTTP implementations live in sub-modules.

mod data_api;
mod sales;

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::Value;

use crate::identity::User;

pub use data_api::HttpDataApi;
pub use sales::HttpSalesApi;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The service answered with a non-success status. Carried verbatim for passthrough.
    #[error("upstream responded with status {status}")]
    Status { status: u16, content_type: Option<String>, body: Bytes },
    #[error("upstream unreachable: {0}")]
    Transport(String),
    #[error("upstream payload invalid: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { UpstreamError::Decode(err.to_string()) } else { UpstreamError::Transport(err.to_string()) }
    }
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status: 404, .. })
    }
}

/// Per-user JSON documents held by the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Histories,
    Tickets,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Histories => "histories",
            Collection::Tickets => "tickets",
        }
    }
}

/// A response from the sales API, relayed to the client untouched.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Read-only view of the external user-record store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `GET /users?email=`; zero or more matches.
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, UpstreamError>;
    /// `GET /users/:id`; `None` when the store has no such user.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UpstreamError>;
}

/// Whole-document get/put against the history and ticket stores.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, collection: Collection, user_id: &str) -> Result<Value, UpstreamError>;
    async fn replace(&self, collection: Collection, user_id: &str, doc: &Value) -> Result<(), UpstreamError>;
}

#[async_trait]
pub trait SalesApi: Send + Sync {
    /// Forward an order body as-is. Non-success answers come back as `UpstreamError::Status`.
    async fn purchase(&self, content_type: Option<String>, body: Bytes) -> Result<Reply, UpstreamError>;
}

/// Shared outbound client. `None` leaves calls without a deadline.
pub fn build_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(t) = timeout { builder = builder.timeout(t); }
    builder.build()
}

/// Turn a non-success response into `UpstreamError::Status`, keeping its body.
async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = resp.status();
    if status.is_success() { return Ok(resp); }
    let (status, content_type, body) = capture(resp).await?;
    Err(UpstreamError::Status { status, content_type, body })
}

async fn capture(resp: reqwest::Response) -> Result<(u16, Option<String>, Bytes), UpstreamError> {
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = resp.bytes().await?;
    Ok((status, content_type, body))
}
