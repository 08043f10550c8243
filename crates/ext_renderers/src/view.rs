//! Displayable views and the rendering primitives handed to plugins.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Message shown by tabular views with nothing to display
pub const NO_DATA: &str = "No data";

/// Output of a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Text { text: String },
    Number { value: String },
    Json { source: String },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Empty { message: String },
    Stack { children: Vec<View> },
}

impl View {
    pub fn is_empty_state(&self) -> bool {
        matches!(self, View::Empty { .. })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Text { text } => f.write_str(text),
            View::Number { value } => f.write_str(value),
            View::Json { source } => f.write_str(source),
            View::Empty { message } => write!(f, "({message})"),
            View::Table { headers, rows } => {
                let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
                for row in rows {
                    for (i, cell) in row.iter().enumerate() {
                        if let Some(w) = widths.get_mut(i) {
                            *w = (*w).max(cell.chars().count());
                        }
                    }
                }
                write_row(f, headers, &widths)?;
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                write_row(f, &rule, &widths)?;
                for row in rows {
                    write_row(f, row, &widths)?;
                }
                Ok(())
            }
            View::Stack { children } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}", w = *w))
        .collect();
    writeln!(f, "{}", line.join("  ").trim_end())
}

/// Render a single JSON value as table/text cell content.
///
/// Strings are shown verbatim, null as an empty cell, everything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Host rendering primitives exposed to extension code.
/// Largest fraction digit count `Primitives::number` will format
pub const MAX_PRECISION: u32 = 17;

#[derive(Debug, Clone, Copy, Default)]
pub struct Primitives;

impl Primitives {
    pub fn text(&self, text: impl Into<String>) -> View {
        View::Text { text: text.into() }
    }

    /// Format a number, fixing the fraction digits when `precision` is set.
    ///
    /// Precision is capped at [`MAX_PRECISION`].
    pub fn number(&self, value: f64, precision: Option<u32>) -> View {
        let value = match precision {
            Some(p) => format!("{value:.prec$}", prec = p.min(MAX_PRECISION) as usize),
            None => value.to_string(),
        };
        View::Number { value }
    }

    pub fn json(&self, data: &Value, compact: bool) -> View {
        let source = if compact {
            data.to_string()
        } else {
            format!("{data:#}")
        };
        View::Json { source }
    }

    pub fn empty(&self, message: impl Into<String>) -> View {
        View::Empty {
            message: message.into(),
        }
    }

    pub fn stack(&self, children: Vec<View>) -> View {
        View::Stack { children }
    }

    /// Tabulate an array of records.
    ///
    /// Columns come from `columns` when given, otherwise from the key set of
    /// the first record. Later records only contribute values for those keys.
    pub fn table(&self, data: &Value, columns: Option<&[String]>) -> View {
        let records = match data.as_array() {
            Some(records) if !records.is_empty() => records,
            _ => return self.empty(NO_DATA),
        };

        let headers: Vec<String> = match (columns, records[0].as_object()) {
            (Some(columns), _) => columns.to_vec(),
            (None, Some(first)) => first.keys().cloned().collect(),
            (None, None) => {
                let rows = records.iter().map(|r| vec![cell_text(r)]).collect();
                return View::Table {
                    headers: vec!["value".to_string()],
                    rows,
                };
            }
        };

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h.as_str()).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        View::Table { headers, rows }
    }

    /// Replace `{{field.path}}` placeholders with values from `data`.
    ///
    /// `{{.}}` stands for the whole value. Unknown paths expand to nothing and
    /// an unterminated `{{` is copied through as-is.
    pub fn interpolate(&self, template: &str, data: &Value) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = after[..end].trim();
            if let Some(value) = lookup_path(data, key) {
                out.push_str(&cell_text(value));
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }
}

fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path == "." || path.is_empty() {
        return Some(data);
    }
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(segment),
    })
}
