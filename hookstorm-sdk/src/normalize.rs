//! Key normalization from the wire naming to the domain naming.
//!
//! The backend speaks snake_case, the domain objects are camelCase. The
//! rewrite is applied to every object key at any depth, so it also reaches
//! into event bodies and header maps. Scalars are returned unchanged.

use serde_json::{Map, Value};

/// Return a copy of `value` with every object key rewritten by
/// [`snake_to_camel`].
pub fn normalize_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, nested)| (snake_to_camel(key), normalize_keys(nested)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize_keys).collect()),
        scalar => scalar.clone(),
    }
}

/// Owning variant of [`normalize_keys`] that reuses the scalar leaves.
pub fn into_normalized(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, nested) in map {
                out.insert(snake_to_camel(&key), into_normalized(nested));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(into_normalized).collect()),
        scalar => scalar,
    }
}

/// Rewrite a single key.
///
/// A `_` or `-` directly followed by an ASCII lowercase letter is dropped
/// and the letter upper-cased. Separators followed by anything else are
/// left alone, so `a__b` becomes `a_B` and `a_1` stays `a_1`.
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        if matches!(c, '_' | '-') {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }

    out
}
