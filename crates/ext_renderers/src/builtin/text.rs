//! Plain-text view.

use linkme::distributed_slice;
use serde_json::Value;

use super::{BuiltinRenderer, BUILTIN_RENDERERS};
use crate::view::{cell_text, Primitives, View};

#[distributed_slice(BUILTIN_RENDERERS)]
static TEXT: fn() -> BuiltinRenderer = || BuiltinRenderer {
    name: "text",
    aliases: &["string"],
    render,
};

pub(super) fn render(data: &Value, _options: Option<&Value>) -> View {
    Primitives.text(cell_text(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_rendering() {
        assert_eq!(render(&json!("hello"), None).to_string(), "hello");
        assert_eq!(render(&Value::Null, None).to_string(), "");
        assert_eq!(render(&json!([1, "a"]), None).to_string(), r#"[1,"a"]"#);
    }
}
