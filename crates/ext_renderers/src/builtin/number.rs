//! Numeric view.

use linkme::distributed_slice;
use serde_json::Value;

use super::{option_u32, BuiltinRenderer, BUILTIN_RENDERERS};
use crate::view::{Primitives, View};

#[distributed_slice(BUILTIN_RENDERERS)]
static NUMBER: fn() -> BuiltinRenderer = || BuiltinRenderer {
    name: "number",
    aliases: &["integer", "float"],
    render,
};

/// Options: `precision` (u32) fixes the number of fraction digits.
///
/// Numeric strings are accepted; anything else falls back to the text view.
fn render(data: &Value, options: Option<&Value>) -> View {
    let precision = option_u32(options, "precision");

    if precision.is_none() {
        if let Some(i) = data.as_i64() {
            return View::Number {
                value: i.to_string(),
            };
        }
        if let Some(u) = data.as_u64() {
            return View::Number {
                value: u.to_string(),
            };
        }
    }

    let parsed = match data {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };

    match parsed {
        Some(value) => Primitives.number(value, precision),
        None => super::text::render(data, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_passthrough() {
        assert_eq!(render(&json!(42), None).to_string(), "42");
    }

    #[test]
    fn test_precision() {
        let view = render(&json!(1.23456), Some(&json!({"precision": 2})));
        assert_eq!(view, View::Number { value: "1.23".to_string() });
    }

    #[test]
    fn test_precision_is_capped() {
        let view = render(&json!(0.5), Some(&json!({"precision": u32::MAX})));
        let View::Number { value } = view else {
            panic!("expected a number view");
        };
        assert_eq!(value, format!("{:.17}", 0.5));
        assert_eq!(value.split('.').nth(1).map(str::len), Some(17));
    }

    #[test]
    fn test_numeric_string_and_fallback() {
        assert_eq!(render(&json!(" 1.5 "), None).to_string(), "1.5");
        assert_eq!(
            render(&json!("n/a"), None),
            View::Text { text: "n/a".to_string() }
        );
    }
}
