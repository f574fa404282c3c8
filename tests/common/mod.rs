//! Shared fixtures: in-memory collaborators that count every downstream call, and helpers
//! to drive the router with `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use faregate::identity::{DirectoryVerifier, SessionManager, User};
use faregate::security::{hash_password_with, Argon2Check, PasswordCheck};
use faregate::server::{router, AppState};
use faregate::upstream::{Collection, DocumentStore, Reply, SalesApi, UpstreamError, UserDirectory};

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "password";
pub const USER_ID: &str = "asdfg1";

// Low-cost Argon2 parameters; verification reads them back from the PHC string.
pub fn phc_for(password: &str) -> String {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::new(1024, 1, 1, None).unwrap());
    hash_password_with(&argon2, password).unwrap()
}

pub fn seeded_user() -> User {
    User {
        id: USER_ID.into(),
        email: EMAIL.into(),
        password_hash: phc_for(PASSWORD),
        name: Some("Test User".into()),
        phone: Some("+358401234567".into()),
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    pub users: Vec<User>,
    pub calls: AtomicUsize,
    pub down: AtomicBool,
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) { return Err(UpstreamError::Transport("connection refused".into())); }
        Ok(self.users.iter().filter(|u| u.email == email).cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) { return Err(UpstreamError::Transport("connection refused".into())); }
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}

/// Documents keyed by (collection, user id). Missing documents answer 404 like a REST store.
#[derive(Default)]
pub struct MemoryDocuments {
    pub docs: Mutex<HashMap<(Collection, String), Value>>,
    pub calls: AtomicUsize,
    pub writes: AtomicUsize,
    pub replace_attempts: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryDocuments {
    pub fn put(&self, collection: Collection, user_id: &str, doc: Value) {
        self.docs.lock().insert((collection, user_id.to_string()), doc);
    }

    pub fn get(&self, collection: Collection, user_id: &str) -> Option<Value> {
        self.docs.lock().get(&(collection, user_id.to_string())).cloned()
    }
}

pub fn not_found() -> UpstreamError {
    UpstreamError::Status {
        status: 404,
        content_type: Some("application/json; charset=utf-8".into()),
        body: Bytes::from_static(b"{}"),
    }
}

pub fn store_offline() -> UpstreamError {
    UpstreamError::Status {
        status: 503,
        content_type: Some("text/plain; charset=utf-8".into()),
        body: Bytes::from_static(b"store offline"),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn fetch(&self, collection: Collection, user_id: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) { return Err(store_offline()); }
        self.get(collection, user_id).ok_or_else(not_found)
    }

    async fn replace(&self, collection: Collection, user_id: &str, doc: &Value) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replace_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 500,
                content_type: Some("text/plain".into()),
                body: Bytes::from_static(b"disk full"),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.put(collection, user_id, doc.clone());
        Ok(())
    }
}

/// Sales API double that answers with a canned result and remembers the last order.
pub struct ScriptedSales {
    pub answer: Mutex<Result<Reply, UpstreamError>>,
    pub last: Mutex<Option<(Option<String>, Bytes)>>,
    pub calls: AtomicUsize,
}

impl Default for ScriptedSales {
    fn default() -> Self {
        Self {
            answer: Mutex::new(Ok(Reply { status: 200, content_type: Some("application/json".into()), body: Bytes::from_static(b"{}") })),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SalesApi for ScriptedSales {
    async fn purchase(&self, content_type: Option<String>, body: Bytes) -> Result<Reply, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some((content_type, body));
        match &*self.answer.lock() {
            Ok(r) => Ok(r.clone()),
            Err(UpstreamError::Status { status, content_type, body }) => Err(UpstreamError::Status {
                status: *status,
                content_type: content_type.clone(),
                body: body.clone(),
            }),
            Err(other) => Err(UpstreamError::Transport(other.to_string())),
        }
    }
}

pub struct Harness {
    pub app: Router,
    pub sessions: Arc<SessionManager>,
    pub users: Arc<MemoryDirectory>,
    pub documents: Arc<MemoryDocuments>,
    pub sales: Arc<ScriptedSales>,
}

impl Harness {
    pub fn new(session_dir: &Path) -> Self {
        Self::with_ttl(session_dir, Some(Duration::from_secs(3600)))
    }

    pub fn with_ttl(session_dir: &Path, ttl: Option<Duration>) -> Self {
        Self::build(session_dir, ttl, Arc::new(Argon2Check))
    }

    pub fn build(session_dir: &Path, ttl: Option<Duration>, passwords: Arc<dyn PasswordCheck>) -> Self {
        let sessions = Arc::new(SessionManager::open(session_dir, ttl).unwrap());
        let users = Arc::new(MemoryDirectory { users: vec![seeded_user()], ..Default::default() });
        let documents = Arc::new(MemoryDocuments::default());
        let sales = Arc::new(ScriptedSales::default());
        let state = AppState {
            sessions: sessions.clone(),
            verifier: Arc::new(DirectoryVerifier::new(users.clone(), passwords)),
            documents: documents.clone(),
            sales: sales.clone(),
            cookie_secure: false,
        };
        Self { app: router(state), sessions, users, documents, sales }
    }

    pub fn downstream_calls(&self) -> usize {
        self.users.calls.load(Ordering::SeqCst)
            + self.documents.calls.load(Ordering::SeqCst)
            + self.sales.calls.load(Ordering::SeqCst)
    }

    pub async fn send(&self, req: Request<Body>) -> Sent {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        Sent { status, set_cookie, content_type, body }
    }

    /// Make first contact and return the cookie pair (`name=value`) the gateway issued.
    pub async fn first_contact(&self) -> String {
        let sent = self.send(get("/", None)).await;
        cookie_pair(sent.set_cookie.as_deref().expect("session cookie on first contact"))
    }

    /// First contact followed by a successful login.
    pub async fn logged_in(&self) -> String {
        let cookie = self.first_contact().await;
        let sent = self.send(post_json("/auth", Some(&cookie), serde_json::json!({"email": EMAIL, "password": PASSWORD}))).await;
        assert_eq!(sent.status, StatusCode::OK, "login failed: {}", sent.text());
        cookie
    }
}

pub struct Sent {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Sent {
    pub fn json(&self) -> Value { serde_json::from_slice(&self.body).unwrap() }
    pub fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }
}

pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

pub fn token_of(cookie_pair: &str) -> String {
    cookie_pair.split_once('=').unwrap().1.to_string()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie { b = b.header(header::COOKIE, c); }
    b.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie { b = b.header(header::COOKIE, c); }
    b.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
}

pub fn post_raw(uri: &str, cookie: Option<&str>, content_type: &str, body: &'static [u8]) -> Request<Body> {
    let mut b = Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, content_type);
    if let Some(c) = cookie { b = b.header(header::COOKIE, c); }
    b.body(Body::from(body)).unwrap()
}
