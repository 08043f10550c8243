//! Evaluated plugin modules and the registration contract.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ext_renderers::{Primitives, Renderer, RendererRegistry};
use serde_json::Value;

use crate::PluginError;

/// Registration entry point exported by an extension module.
///
/// Invoked once per load with a [`PluginHost`] bound to the shared registry.
/// Async entry points are awaited before the extension counts as loaded.
#[async_trait]
pub trait PluginEntry: Send + Sync {
    async fn register(&self, host: &PluginHost) -> Result<(), PluginError>;
}

struct FnEntry<F>(F);

#[async_trait]
impl<F> PluginEntry for FnEntry<F>
where
    F: Fn(&PluginHost) -> Result<(), PluginError> + Send + Sync,
{
    async fn register(&self, host: &PluginHost) -> Result<(), PluginError> {
        (self.0)(host)
    }
}

/// Wrap a synchronous closure as an entry point
pub fn entry_fn<F>(f: F) -> Arc<dyn PluginEntry>
where
    F: Fn(&PluginHost) -> Result<(), PluginError> + Send + Sync + 'static,
{
    Arc::new(FnEntry(f))
}

/// What an extension sees of the host while registering
#[derive(Clone)]
pub struct PluginHost {
    registry: Arc<RendererRegistry>,
    primitives: Primitives,
}

impl PluginHost {
    pub fn new(registry: Arc<RendererRegistry>) -> Self {
        Self {
            registry,
            primitives: Primitives,
        }
    }

    pub fn register_renderer(&self, name: impl Into<String>, renderer: Renderer) {
        self.registry.register(name, renderer);
    }

    pub fn unregister_renderer(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    pub fn lookup_renderer(&self, name: &str) -> Option<Renderer> {
        self.registry.lookup(name)
    }

    pub fn primitives(&self) -> Primitives {
        self.primitives
    }
}

/// A named export of an evaluated module
#[derive(Clone)]
pub enum Export {
    Entry(Arc<dyn PluginEntry>),
    Value(Value),
}

impl Export {
    /// Present for entry-point resolution: null, false, 0 and "" are skipped
    fn is_truthy(&self) -> bool {
        match self {
            Export::Entry(_) => true,
            Export::Value(Value::Null) => false,
            Export::Value(Value::Bool(b)) => *b,
            Export::Value(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Export::Value(Value::String(s)) => !s.is_empty(),
            Export::Value(_) => true,
        }
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Entry(_) => f.write_str("Entry(..)"),
            Export::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// An evaluated extension module
#[derive(Clone, Default)]
pub struct PluginModule {
    exports: HashMap<String, Export>,
    callable: Option<Arc<dyn PluginEntry>>,
}

impl PluginModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    /// Make the module object itself callable
    pub fn with_callable(mut self, entry: Arc<dyn PluginEntry>) -> Self {
        self.callable = Some(entry);
        self
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Pick the registration entry point.
    ///
    /// The first present candidate wins: export `default`, export `register`,
    /// then the module itself. The winner must be callable; a present but
    /// non-callable candidate does not fall through to the next one.
    pub fn entry_point(&self) -> Result<Arc<dyn PluginEntry>, PluginError> {
        let candidate = ["default", "register"]
            .into_iter()
            .find_map(|name| self.exports.get(name).filter(|e| e.is_truthy()).map(|e| (name, e)));

        match candidate {
            Some((_, Export::Entry(entry))) => Ok(Arc::clone(entry)),
            Some((name, Export::Value(_))) => Err(PluginError::missing_entry_point(format!(
                "export '{name}' is not callable"
            ))),
            None => self.callable.clone().ok_or_else(|| {
                PluginError::missing_entry_point("module exports no default, register, or callable")
            }),
        }
    }
}

impl fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginModule")
            .field("exports", &self.export_names())
            .field("callable", &self.callable.is_some())
            .finish()
    }
}
