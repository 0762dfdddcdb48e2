//! Dotted field paths over JSON buffers and normalized comparison.
//!
//! A path is a `.`-separated list of object keys and array indexes, e.g.
//! `0.address.address_zip_code`.

use serde_json::{Map, Value};

/// Drop `null` object members recursively so that `null` and an absent key
/// compare equal. Object key order never matters (`Map` is ordered).
pub(crate) fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        other => other.clone(),
    }
}

/// Whether two buffers hold the same data.
pub(crate) fn same_data(a: &Value, b: &Value) -> bool {
    normalize(a) == normalize(b)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// The value at `path`, if every segment resolves.
pub(crate) fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, step)
}

/// Write `value` at `path`.
///
/// Missing or `null` intermediate objects are created; array indexes must
/// already exist. Returns `None` when the path cannot be resolved.
pub(crate) fn set(root: &mut Value, path: &str, value: Value) -> Option<()> {
    if path.is_empty() {
        return None;
    }
    let mut segments = path.split('.').peekable();
    let mut current = root;

    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => {
                if last {
                    map.insert(segment.to_owned(), value);
                    return Some(());
                }
                map.entry(segment.to_owned()).or_insert(Value::Null)
            }
            Value::Array(items) => {
                let slot = items.get_mut(segment.parse::<usize>().ok()?)?;
                if last {
                    *slot = value;
                    return Some(());
                }
                slot
            }
            _ => return None,
        };
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_null_and_absent_are_equal() {
        let a = json!({"name": "Casa", "phone": null});
        let b = json!({"name": "Casa"});
        assert!(same_data(&a, &b));
        assert!(!same_data(&a, &json!({"name": "Casa", "phone": ""})));
    }

    #[test]
    fn test_key_order_is_ignored() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": {"x": 1, "y": 2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": {"y": 2, "x": 1}, "a": 1}"#).unwrap();
        assert!(same_data(&a, &b));
    }

    #[test]
    fn test_get_nested_indexed_path() {
        let root = json!([{"address": {"address_zip_code": "01001-000"}}]);
        assert_eq!(
            get(&root, "0.address.address_zip_code"),
            Some(&json!("01001-000"))
        );
        assert_eq!(get(&root, "1.address"), None);
    }

    #[test]
    fn test_set_nested_indexed_path() {
        let mut root = json!([{"address": {"address_zip_code": ""}}]);
        set(&mut root, "0.address.address_zip_code", json!("01001-000")).unwrap();
        assert_eq!(root[0]["address"]["address_zip_code"], "01001-000");
    }

    #[test]
    fn test_set_creates_missing_objects() {
        let mut root = json!({"pix": null});
        set(&mut root, "pix.key", json!("a@b.com")).unwrap();
        assert_eq!(root["pix"]["key"], "a@b.com");
    }

    #[test]
    fn test_set_rejects_bad_paths() {
        let mut root = json!([{"name": "a"}]);
        assert!(set(&mut root, "3.name", json!("b")).is_none());
        assert!(set(&mut root, "x.name", json!("b")).is_none());
        assert!(set(&mut root, "0.name.deeper", json!("b")).is_none());
        assert!(set(&mut root, "", json!("b")).is_none());
    }
}
