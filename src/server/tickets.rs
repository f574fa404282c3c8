//! `/tickets`: purchased tickets keyed by their validity end (unix seconds).
//!
//! Store document shape: `{ "id": "<user>", "<valid_until>": { ..ticket.. }, .. }`.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::payload::JsonBody;
use super::AppState;
use crate::error::{passthrough, AppError};
use crate::identity::Subject;
use crate::upstream::Collection;

const RESERVED_KEY: &str = "id";

fn key_secs(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Tickets whose key lies strictly after `now`, each annotated with `valid_until`.
/// Ordered by expiry, soonest first.
pub fn active_tickets(doc: &Value, now: i64) -> Vec<Value> {
    let Some(map) = doc.as_object() else { return Vec::new(); };
    let mut live: Vec<(f64, &String, &Value)> = map
        .iter()
        .filter(|(k, _)| k.as_str() != RESERVED_KEY)
        .filter_map(|(k, v)| key_secs(k).filter(|secs| *secs > now as f64).map(|secs| (secs, k, v)))
        .collect();
    live.sort_by(|a, b| a.0.total_cmp(&b.0));
    live.into_iter()
        .map(|(_, key, payload)| {
            let mut out = match payload {
                Value::Object(m) => m.clone(),
                other => {
                    let mut m = Map::new();
                    m.insert("ticket".to_string(), other.clone());
                    m
                }
            };
            out.insert("valid_until".to_string(), Value::String(key.clone()));
            Value::Object(out)
        })
        .collect()
}

/// Unix seconds as submitted: a non-negative JSON integer, or a string of decimal digits.
fn submitted_secs(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) { return None; }
            s.parse().ok()
        }
        _ => None,
    }
}

/// Split a submitted ticket into its store key and payload. The key is the canonical
/// decimal form of `valid_until`, so one instant always maps to one entry.
pub fn split_submission(body: Value) -> Result<(String, Value), AppError> {
    let Value::Object(mut m) = body else {
        return Err(AppError::user("invalid_ticket", "ticket must be a JSON object"));
    };
    let Some(raw) = m.remove("valid_until") else {
        return Err(AppError::user("invalid_ticket", "valid_until is required"));
    };
    let Some(secs) = submitted_secs(&raw) else {
        return Err(AppError::user("invalid_ticket".to_string(), format!("valid_until {raw} is not a unix timestamp in whole seconds")));
    };
    Ok((secs.to_string(), Value::Object(m)))
}

/// `GET /tickets`
pub async fn list(State(state): State<AppState>, Extension(Subject(user_id)): Extension<Subject>) -> Response {
    match state.documents.fetch(Collection::Tickets, &user_id).await {
        Ok(doc) => Json(active_tickets(&doc, chrono::Utc::now().timestamp())).into_response(),
        Err(e) => {
            warn!(target: "faregate::tickets", user = %user_id, "ticket fetch failed: {e}");
            passthrough(e)
        }
    }
}

/// `POST /tickets`
pub async fn store(
    State(state): State<AppState>,
    Extension(Subject(user_id)): Extension<Subject>,
    JsonBody(body): JsonBody<Value>,
) -> Response {
    let (key, payload) = match split_submission(body) {
        Ok(parts) => parts,
        Err(e) => return e.into_response(),
    };
    let mut doc = match state.documents.fetch(Collection::Tickets, &user_id).await {
        Ok(Value::Object(m)) => m,
        Ok(_) => Map::from_iter([(RESERVED_KEY.to_string(), Value::String(user_id.clone()))]),
        Err(e) => {
            warn!(target: "faregate::tickets", user = %user_id, "ticket fetch failed: {e}");
            return passthrough(e);
        }
    };
    doc.insert(key.clone(), payload);
    if let Err(e) = state.documents.replace(Collection::Tickets, &user_id, &Value::Object(doc)).await {
        warn!(target: "faregate::tickets", user = %user_id, "ticket write failed: {e}");
        return passthrough(e);
    }
    info!(target: "faregate::tickets", user = %user_id, valid_until = %key, "ticket stored");
    "OK".into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_future_tickets_are_listed() {
        let doc = json!({"id": "u1", "100": {"zone": "AB"}, "9999999999": {"zone": "ABC"}});
        let out = active_tickets(&doc, 1_700_000_000);
        assert_eq!(out, vec![json!({"zone": "ABC", "valid_until": "9999999999"})]);
    }

    #[test]
    fn boundary_second_is_already_expired() {
        let doc = json!({"1000": {}, "1001": {}});
        let out = active_tickets(&doc, 1000);
        assert_eq!(out, vec![json!({"valid_until": "1001"})]);
    }

    #[test]
    fn non_numeric_keys_skipped_and_scalars_wrapped() {
        let doc = json!({"id": "99999999999", "notes": {}, "9999999999": "raw"});
        let out = active_tickets(&doc, 0);
        assert_eq!(out, vec![json!({"ticket": "raw", "valid_until": "9999999999"})]);
    }

    #[test]
    fn listing_is_ordered_by_expiry() {
        let doc = json!({"30000": {"n": 3}, "200000": {"n": 20}, "10000": {"n": 1}});
        let ns: Vec<i64> = active_tickets(&doc, 0).iter().map(|t| t["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 3, 20]);
    }

    #[test]
    fn submission_splits_key_from_payload() {
        let (k, p) = split_submission(json!({"valid_until": 1900000000, "zone": "AB"})).unwrap();
        assert_eq!(k, "1900000000");
        assert_eq!(p, json!({"zone": "AB"}));
        assert!(split_submission(json!({"zone": "AB"})).is_err());
        assert!(split_submission(json!({"valid_until": "soon"})).is_err());
        assert!(split_submission(json!([1])).is_err());
    }

    #[test]
    fn submitted_keys_are_canonical_integers() {
        let key = |v: Value| split_submission(json!({"valid_until": v})).map(|(k, _)| k);
        assert_eq!(key(json!(" 42 ")).unwrap(), "42");
        assert_eq!(key(json!("0010000000000")).unwrap(), "10000000000");
        assert_eq!(key(json!(10000000000u64)).unwrap(), "10000000000");
        for bad in [json!("1.5"), json!("1e10"), json!(1.5), json!(1e10), json!("-7"), json!(-7), json!("+7"), json!(""), json!(true), json!(null)] {
            let err = key(bad.clone()).unwrap_err();
            assert_eq!(err.http_status(), 400, "{bad}");
        }
    }
}
