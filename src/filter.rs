//! Metadata filter engine.
//!
//! A filter maps metadata keys to predicates. A predicate is either a raw
//! JSON value (match iff the key exists and equals it) or an object
//! `{"operator": OP, "value": V}` with OP in gt/gte/lt/lte/contains/in/
//! not_in/regex. Filters run after k-NN ranking and only drop entries, so a
//! filtered result may hold fewer than k chunks even when more matches exist
//! below the top-k cutoff.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

/// True iff `metadata` satisfies every predicate in `filters`.
///
/// A missing key never matches, whatever the predicate.
pub fn matches(metadata: &HashMap<String, Value>, filters: &HashMap<String, Value>) -> bool {
    filters.iter().all(|(key, predicate)| {
        metadata
            .get(key)
            .is_some_and(|actual| matches_predicate(actual, predicate))
    })
}

fn matches_predicate(actual: &Value, predicate: &Value) -> bool {
    if let Some(spec) = predicate.as_object() {
        if let Some(op) = spec.get("operator").and_then(Value::as_str) {
            let expected = spec.get("value").unwrap_or(&Value::Null);
            return apply_operator(actual, op, expected);
        }
    }
    actual == predicate
}

fn apply_operator(actual: &Value, op: &str, expected: &Value) -> bool {
    match op {
        "gt" => compare(actual, expected) == Some(Ordering::Greater),
        "gte" => matches!(
            compare(actual, expected),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        "lt" => compare(actual, expected) == Some(Ordering::Less),
        "lte" => matches!(
            compare(actual, expected),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        "contains" => match (actual.as_str(), expected.as_str()) {
            (Some(haystack), Some(needle)) => {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
            _ => false,
        },
        "in" => expected
            .as_array()
            .is_some_and(|values| values.contains(actual)),
        "not_in" => expected
            .as_array()
            .is_some_and(|values| !values.contains(actual)),
        "regex" => match expected.as_str().map(Regex::new) {
            // A pattern that fails to compile matches nothing.
            Some(Ok(re)) => re.is_match(&value_to_string(actual)),
            _ => false,
        },
        // Unknown operator degrades to an equality check against the value.
        _ => actual == expected,
    }
}

/// Ordering between two values, when one exists.
///
/// Numbers compare numerically, strings lexicographically; any other pairing
/// is non-orderable and yields `None` (a non-match for gt/gte/lt/lte).
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
