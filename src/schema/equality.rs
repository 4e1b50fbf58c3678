//! Deep structural equality for JSON values.

use serde_json::{Map, Number, Value};

/// Compare two JSON values structurally.
///
/// Unlike `Value`'s `PartialEq`, numbers compare by numeric value, so `1`
/// and `1.0` are equal. Object key order never matters.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => json_map_eq(xs, ys),
        _ => a == b,
    }
}

/// [`json_eq`] for two objects.
pub fn json_map_eq(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, x)| b.get(key).is_some_and(|y| json_eq(x, y)))
}

#[allow(clippy::float_cmp)]
fn numbers_eq(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_and_float_forms_are_equal() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(!json_eq(&json!(1), &json!(1.5)));
    }

    #[test]
    fn test_nested_structures_compare_deeply() {
        let a = json!({ "text": "", "marks": [{ "bold": true }] });
        let b = json!({ "marks": [{ "bold": true }], "text": "" });
        assert!(json_eq(&a, &b));
        assert!(!json_eq(&a, &json!({ "text": "" })));
    }

    #[test]
    fn test_different_kinds_never_equal() {
        assert!(!json_eq(&json!(0), &json!(false)));
        assert!(!json_eq(&json!(""), &json!(null)));
        assert!(!json_eq(&json!([]), &json!({})));
    }
}
