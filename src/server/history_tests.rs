use super::*;

#[test]
fn duplicates_collapse_in_first_seen_order() {
    let out = merge_entries(vec![], vec![json!({"q": 1}), json!({"q": 1}), json!({"q": 2})]);
    assert_eq!(out, vec![json!({"q": 1}), json!({"q": 2})]);
}

#[test]
fn falsy_entries_are_dropped() {
    let out = merge_entries(vec![], vec![Value::Null, json!({"q": 1}), Value::Null, json!({"q": 1})]);
    assert_eq!(out, vec![json!({"q": 1})]);
    let out = merge_entries(vec![json!(0), json!(""), json!(false)], vec![json!({}), json!([]), json!("x")]);
    assert_eq!(out, vec![json!("x")]);
}

#[test]
fn deep_equality_ignores_key_order() {
    let a: Value = serde_json::from_str(r#"{"from":"A","to":{"lat":1,"lon":2}}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"to":{"lon":2,"lat":1},"from":"A"}"#).unwrap();
    assert_eq!(dedup(vec![a.clone(), b]), vec![a]);
}

#[test]
fn existing_entries_keep_their_position() {
    let out = merge_entries(vec![json!({"q": 2}), json!({"q": 3})], vec![json!({"q": 1}), json!({"q": 2})]);
    assert_eq!(out, vec![json!({"q": 2}), json!({"q": 3}), json!({"q": 1})]);
}

#[test]
fn payload_accepts_array_or_wrapped_object() {
    let p: HistoryPayload = serde_json::from_value(json!([{"q": 1}])).unwrap();
    assert_eq!(p.into_entries(), vec![json!({"q": 1})]);
    let p: HistoryPayload = serde_json::from_value(json!({"queries": [{"q": 2}]})).unwrap();
    assert_eq!(p.into_entries(), vec![json!({"q": 2})]);
}

#[test]
fn queries_read_from_document_or_bare_array() {
    assert_eq!(queries_of(&json!({"id": "u1", "queries": [1, 2]})), vec![json!(1), json!(2)]);
    assert_eq!(queries_of(&json!([3])), vec![json!(3)]);
    assert!(queries_of(&json!({"id": "u1"})).is_empty());
}
