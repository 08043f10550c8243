//! Tabular view for arrays of uniformly shaped records.

use linkme::distributed_slice;
use serde_json::Value;

use super::{BuiltinRenderer, BUILTIN_RENDERERS};
use crate::view::{Primitives, View};

#[distributed_slice(BUILTIN_RENDERERS)]
static TABLE: fn() -> BuiltinRenderer = || BuiltinRenderer {
    name: "table",
    aliases: &["records"],
    render,
};

/// Options: `columns` (array of strings) pins the column set.
fn render(data: &Value, options: Option<&Value>) -> View {
    let columns: Option<Vec<String>> = options
        .and_then(|o| o.get("columns"))
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });
    Primitives.table(data, columns.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::NO_DATA;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_and_non_array_inputs() {
        for input in [json!([]), json!({"a": 1}), json!("text"), Value::Null] {
            let view = render(&input, None);
            assert_eq!(
                view,
                View::Empty {
                    message: NO_DATA.to_string()
                }
            );
        }
    }

    #[test]
    fn test_headers_from_first_record() {
        let view = render(&json!([{"a": 1, "b": 2}, {"a": 3}]), None);
        assert_eq!(
            view,
            View::Table {
                headers: vec!["a".to_string(), "b".to_string()],
                rows: vec![
                    vec!["1".to_string(), "2".to_string()],
                    vec!["3".to_string(), String::new()],
                ],
            }
        );
    }

    #[test]
    fn test_extra_keys_in_later_records_are_ignored() {
        let view = render(&json!([{"a": "x"}, {"a": "y", "c": true}]), None);
        match view {
            View::Table { headers, rows } => {
                assert_eq!(headers, vec!["a".to_string()]);
                assert_eq!(rows[1], vec!["y".to_string()]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_records_use_value_column() {
        let view = render(&json!([1, "two"]), None);
        assert_eq!(
            view,
            View::Table {
                headers: vec!["value".to_string()],
                rows: vec![vec!["1".to_string()], vec!["two".to_string()]],
            }
        );
    }

    #[test]
    fn test_pinned_columns() {
        let view = render(
            &json!([{"a": 1, "b": 2}]),
            Some(&json!({"columns": ["b", "z"]})),
        );
        assert_eq!(
            view,
            View::Table {
                headers: vec!["b".to_string(), "z".to_string()],
                rows: vec![vec!["2".to_string(), String::new()]],
            }
        );
    }
}
