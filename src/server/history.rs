//! `/history`: the user's saved route queries.
//!
//! The history store keeps one document per user, `{ "id": .., "queries": [..] }`. Reads
//! return the queries deduplicated; writes append, drop falsy entries, deduplicate and
//! replace the whole document. Read-modify-write is not atomic: two concurrent appends
//! from the same user can lose one of them.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::payload::JsonBody;
use super::AppState;
use crate::error::passthrough;
use crate::identity::Subject;
use crate::upstream::Collection;

/// Entries to append: a bare array or `{ "queries": [..] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HistoryPayload {
    Entries(Vec<Value>),
    Wrapped { queries: Vec<Value> },
}

impl HistoryPayload {
    fn into_entries(self) -> Vec<Value> {
        match self {
            HistoryPayload::Entries(v) | HistoryPayload::Wrapped { queries: v } => v,
        }
    }
}

/// JavaScript truthiness, extended to treat `{}` and `[]` as empty.
pub fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Drop later duplicates by deep equality, keeping first-occurrence order.
pub fn dedup(entries: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(entries.len());
    for e in entries {
        if !out.contains(&e) { out.push(e); }
    }
    out
}

/// Existing entries followed by new ones, without falsy entries or duplicates.
pub fn merge_entries(existing: Vec<Value>, submitted: Vec<Value>) -> Vec<Value> {
    dedup(existing.into_iter().chain(submitted).filter(|v| !is_falsy(v)).collect())
}

fn queries_of(doc: &Value) -> Vec<Value> {
    match doc {
        Value::Array(a) => a.clone(),
        other => other.get("queries").and_then(Value::as_array).cloned().unwrap_or_default(),
    }
}

/// `GET /history`
pub async fn list(State(state): State<AppState>, Extension(Subject(user_id)): Extension<Subject>) -> Response {
    match state.documents.fetch(Collection::Histories, &user_id).await {
        Ok(doc) => Json(dedup(queries_of(&doc))).into_response(),
        Err(e) => {
            warn!(target: "faregate::history", user = %user_id, "history fetch failed: {e}");
            passthrough(e)
        }
    }
}

/// `POST /history`
pub async fn append(
    State(state): State<AppState>,
    Extension(Subject(user_id)): Extension<Subject>,
    JsonBody(payload): JsonBody<HistoryPayload>,
) -> Response {
    let doc = match state.documents.fetch(Collection::Histories, &user_id).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(target: "faregate::history", user = %user_id, "history fetch failed: {e}");
            return passthrough(e);
        }
    };
    let merged = merge_entries(queries_of(&doc), payload.into_entries());
    let count = merged.len();
    let doc = match doc {
        Value::Object(mut m) => {
            m.insert("queries".to_string(), Value::Array(merged));
            Value::Object(m)
        }
        _ => json!({ "id": user_id, "queries": merged }),
    };
    if let Err(e) = state.documents.replace(Collection::Histories, &user_id, &doc).await {
        warn!(target: "faregate::history", user = %user_id, "history write failed: {e}");
        return passthrough(e);
    }
    info!(target: "faregate::history", user = %user_id, entries = count, "history updated");
    "OK".into_response()
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod history_tests;
