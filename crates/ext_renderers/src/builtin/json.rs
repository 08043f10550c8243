//! Generic structured-data view.

use linkme::distributed_slice;
use serde_json::Value;

use super::{option_bool, BuiltinRenderer, BUILTIN_RENDERERS};
use crate::view::{Primitives, View};

#[distributed_slice(BUILTIN_RENDERERS)]
static JSON: fn() -> BuiltinRenderer = || BuiltinRenderer {
    name: "json",
    aliases: &["object", "raw"],
    render,
};

/// Options: `compact` (bool) disables pretty printing.
fn render(data: &Value, options: Option<&Value>) -> View {
    let compact = option_bool(options, "compact").unwrap_or(false);
    Primitives.json(data, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_by_default() {
        let view = render(&json!({"a": 1}), None);
        assert_eq!(view, View::Json { source: "{\n  \"a\": 1\n}".to_string() });
    }

    #[test]
    fn test_compact_option() {
        let view = render(&json!({"a": [1, 2]}), Some(&json!({"compact": true})));
        assert_eq!(view.to_string(), r#"{"a":[1,2]}"#);
    }
}
