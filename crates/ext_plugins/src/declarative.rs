//! Declarative extension modules.
//!
//! A module body is a JSON document whose top-level keys are its exports:
//!
//! ```json
//! {
//!   "default": {
//!     "renderers": [
//!       { "name": "player", "kind": "template", "template": "{{name}} (lv {{level}})" },
//!       { "name": "grid", "kind": "alias", "target": "table" },
//!       { "name": "loot", "kind": "table", "columns": ["item", "qty"] }
//!     ]
//!   },
//!   "version": "1.2.0"
//! }
//! ```
//!
//! An export holding a `renderers` array is a callable entry point. A
//! top-level `renderers` array makes the module object itself callable.

use std::sync::Arc;

use async_trait::async_trait;
use ext_renderers::{Primitives, Renderer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::ExtensionRef;
use crate::fetcher::ModuleEvaluator;
use crate::module::{Export, PluginEntry, PluginHost, PluginModule};
use crate::PluginError;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RendererSpec {
    Template {
        name: String,
        template: String,
    },
    Alias {
        name: String,
        target: String,
    },
    Table {
        name: String,
        #[serde(default)]
        columns: Vec<String>,
    },
}

impl RendererSpec {
    fn name(&self) -> &str {
        match self {
            RendererSpec::Template { name, .. }
            | RendererSpec::Alias { name, .. }
            | RendererSpec::Table { name, .. } => name,
        }
    }
}

#[derive(Debug)]
struct DeclarativeEntry {
    specs: Vec<RendererSpec>,
}

#[async_trait]
impl PluginEntry for DeclarativeEntry {
    async fn register(&self, host: &PluginHost) -> Result<(), PluginError> {
        // Resolve everything first so a bad alias registers nothing.
        let mut resolved = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let renderer = match spec {
                RendererSpec::Template { template, .. } => {
                    let template = template.clone();
                    Renderer::new(move |data, _| {
                        let p = Primitives;
                        p.text(p.interpolate(&template, data))
                    })
                }
                RendererSpec::Alias { name, target } => {
                    host.lookup_renderer(target).ok_or_else(|| {
                        PluginError::registration(format!(
                            "alias '{name}' targets unknown renderer '{target}'"
                        ))
                    })?
                }
                RendererSpec::Table { columns, .. } => {
                    let columns = columns.clone();
                    Renderer::new(move |data, _| {
                        let pinned = (!columns.is_empty()).then_some(columns.as_slice());
                        Primitives.table(data, pinned)
                    })
                }
            };
            resolved.push((spec.name().to_string(), renderer));
        }

        for (name, renderer) in resolved {
            host.register_renderer(name, renderer);
        }
        Ok(())
    }
}

fn parse_entry(object: &Map<String, Value>) -> Option<Result<DeclarativeEntry, PluginError>> {
    let renderers = object.get("renderers")?;
    Some(
        serde_json::from_value::<Vec<RendererSpec>>(renderers.clone())
            .map(|specs| DeclarativeEntry { specs })
            .map_err(|e| PluginError::evaluate(format!("invalid renderers: {e}"))),
    )
}

/// Evaluates JSON module bodies into [`PluginModule`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeEvaluator;

impl ModuleEvaluator for DeclarativeEvaluator {
    fn evaluate(&self, source: &str, reference: &ExtensionRef) -> Result<PluginModule, PluginError> {
        let document: Value = serde_json::from_str(source)
            .map_err(|e| PluginError::evaluate(format!("{reference}: {e}")))?;
        let Value::Object(root) = document else {
            return Err(PluginError::evaluate(format!(
                "{reference}: module body must be a JSON object"
            )));
        };

        let mut module = PluginModule::new();
        if let Some(entry) = parse_entry(&root) {
            module = module.with_callable(Arc::new(entry?));
        }

        for (name, value) in root {
            let export = match value.as_object().and_then(parse_entry) {
                Some(entry) => Export::Entry(Arc::new(entry?)),
                None => Export::Value(value),
            };
            module = module.with_export(name, export);
        }

        Ok(module)
    }
}
