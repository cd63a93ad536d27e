//! Query matching, projection and update modifiers for the in-memory store.
//!
//! A deliberately small subset of the usual document-store operators: enough
//! for clients to exercise filters, projections and both update styles.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::Document;

/// Resolve a dotted path (`"address.city"`) inside `doc`.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// True when every key of `filter` is satisfied by `doc`.
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, condition)| satisfies(lookup(doc, path), condition))
}

fn is_operator_object(condition: &Value) -> bool {
    condition
        .as_object()
        .is_some_and(|ops| !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')))
}

fn satisfies(value: Option<&Value>, condition: &Value) -> bool {
    if !is_operator_object(condition) {
        return value == Some(condition);
    }
    let Some(ops) = condition.as_object() else {
        return false;
    };
    ops.iter().all(|(op, arg)| match op.as_str() {
        "$ne" => value != Some(arg),
        "$gt" => compare(value, arg) == Some(Ordering::Greater),
        "$gte" => matches!(compare(value, arg), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => compare(value, arg) == Some(Ordering::Less),
        "$lte" => matches!(compare(value, arg), Some(Ordering::Less | Ordering::Equal)),
        "$in" => arg
            .as_array()
            .is_some_and(|candidates| value.is_some_and(|v| candidates.contains(v))),
        "$exists" => value.is_some() == arg.as_bool().unwrap_or(true),
        _ => false,
    })
}

fn compare(value: Option<&Value>, arg: &Value) -> Option<Ordering> {
    match (value?, arg) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}

/// Apply an inclusion or exclusion projection. `_id` survives inclusion
/// projections unless it is excluded explicitly.
pub fn project(doc: &Document, projection: &Document) -> Document {
    let id_excluded = projection.get("_id").is_some_and(|v| !is_truthy(v));
    let fields: Vec<(&String, bool)> = projection
        .iter()
        .filter(|(k, _)| k.as_str() != "_id")
        .map(|(k, v)| (k, is_truthy(v)))
        .collect();

    let inclusive = match fields.first() {
        Some((_, include)) => *include,
        // `{_id: 1}` alone selects just the id.
        None => projection.get("_id").is_some_and(is_truthy),
    };
    let mut out = if inclusive {
        let mut out = Map::new();
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
        for (key, _) in fields.iter().filter(|(_, include)| *include) {
            if let Some(value) = doc.get(key.as_str()) {
                out.insert(key.to_string(), value.clone());
            }
        }
        out
    } else {
        let mut out = doc.clone();
        for (key, _) in &fields {
            out.remove(key.as_str());
        }
        out
    };
    if id_excluded {
        out.remove("_id");
    }
    out
}

/// Apply `$set` / `$unset` / `$inc` modifiers, or replace the document while
/// keeping its `_id`.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<(), String> {
    let modifiers = update.keys().filter(|k| k.starts_with('$')).count();
    if modifiers == 0 {
        let id = doc.get("_id").cloned();
        *doc = update.clone();
        if let Some(id) = id {
            doc.insert("_id".to_string(), id);
        }
        return Ok(());
    }
    if modifiers != update.len() {
        return Err("cannot mix modifiers and plain fields".to_string());
    }

    for (modifier, fields) in update {
        let fields = fields
            .as_object()
            .ok_or_else(|| format!("{modifier} expects an object"))?;
        for (key, value) in fields {
            if key == "_id" {
                return Err("cannot modify _id".to_string());
            }
            match modifier.as_str() {
                "$set" => {
                    doc.insert(key.clone(), value.clone());
                }
                "$unset" => {
                    doc.remove(key);
                }
                "$inc" => {
                    let by = value.as_f64().ok_or_else(|| format!("$inc on {key} needs a number"))?;
                    let current = match doc.get(key) {
                        None => 0.0,
                        Some(v) => v.as_f64().ok_or_else(|| format!("$inc on non-numeric {key}"))?,
                    };
                    doc.insert(key.clone(), number(current + by));
                }
                other => return Err(format!("unknown modifier {other}")),
            }
        }
    }
    Ok(())
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
