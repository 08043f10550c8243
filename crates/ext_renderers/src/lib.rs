//! ext_renderers - Renderer registry for dynamically typed data
//!
//! This crate provides:
//! - `RendererRegistry`: name-keyed table of render functions, last writer wins
//! - `Renderer`: cheap-to-clone handle around a render function
//! - `View` / `Primitives`: the displayable output model and the constructors
//!   handed to extension code
//!
//! The registry is an explicitly constructed service object. Hosts build one
//! with [`RendererRegistry::with_builtins`], share it behind an `Arc`, and let
//! extensions add to it at runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

pub mod builtin;
pub mod view;

pub use builtin::{collect_builtins, BuiltinRenderer};
pub use view::{cell_text, Primitives, View, MAX_PRECISION, NO_DATA};

type RenderFn = dyn Fn(&Value, Option<&Value>) -> View + Send + Sync;

/// A registered render function
#[derive(Clone)]
pub struct Renderer(Arc<RenderFn>);

impl Renderer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> View + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn render(&self, data: &Value, options: Option<&Value>) -> View {
        (self.0)(data, options)
    }

    /// Whether both handles point at the same function
    pub fn same_as(&self, other: &Renderer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<fn(&Value, Option<&Value>) -> View> for Renderer {
    fn from(f: fn(&Value, Option<&Value>) -> View) -> Self {
        Self::new(f)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Renderer(..)")
    }
}

/// Central registry mapping capability names to renderers
#[derive(Default)]
pub struct RendererRegistry {
    renderers: RwLock<HashMap<String, Renderer>>,
}

impl RendererRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with every built-in renderer and alias
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.seed_builtins();
        registry
    }

    fn seed_builtins(&self) {
        let mut map = self.write();
        for builtin in collect_builtins() {
            let renderer = Renderer::from(builtin.render);
            for alias in builtin.aliases {
                map.insert((*alias).to_string(), renderer.clone());
            }
            map.insert(builtin.name.to_string(), renderer);
        }
    }

    /// Store a renderer under `name`, replacing and returning any previous one
    pub fn register(&self, name: impl Into<String>, renderer: Renderer) -> Option<Renderer> {
        let name = name.into();
        let previous = self.write().insert(name.clone(), renderer);
        debug!(name = %name, replaced = previous.is_some(), "renderer registered");
        previous
    }

    /// Remove `name`. Returns false when nothing was registered under it.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.write().remove(name).is_some();
        if removed {
            debug!(name, "renderer unregistered");
        }
        removed
    }

    pub fn lookup(&self, name: &str) -> Option<Renderer> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Look up `name` and render `data` with it
    pub fn render(&self, name: &str, data: &Value, options: Option<&Value>) -> Option<View> {
        self.lookup(name).map(|r| r.render(data, options))
    }

    /// Drop every registration and restore the built-in set
    pub fn reset(&self) {
        self.write().clear();
        self.seed_builtins();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Renderer>> {
        self.renderers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Renderer>> {
        self.renderers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("names", &self.list_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_are_seeded() {
        let registry = RendererRegistry::with_builtins();
        for name in ["json", "text", "number", "table", "object", "string", "records"] {
            assert!(registry.contains(name), "missing built-in {name}");
        }
        assert!(RendererRegistry::new().is_empty());
    }

    #[test]
    fn test_aliases_share_the_builtin() {
        let registry = RendererRegistry::with_builtins();
        let json = registry.lookup("json").unwrap();
        let object = registry.lookup("object").unwrap();
        assert!(json.same_as(&object));
    }

    #[test]
    fn test_last_write_wins() {
        let registry = RendererRegistry::with_builtins();
        let custom = Renderer::new(|_, _| View::Text {
            text: "custom".to_string(),
        });

        let previous = registry.register("json", custom.clone());
        assert!(previous.is_some());

        let found = registry.lookup("json").unwrap();
        assert!(found.same_as(&custom));
        assert_eq!(
            registry.render("json", &json!({"a": 1}), None),
            Some(View::Text {
                text: "custom".to_string()
            })
        );
    }

    #[test]
    fn test_unregister() {
        let registry = RendererRegistry::with_builtins();
        assert!(registry.unregister("number"));
        assert!(!registry.unregister("number"));
        assert!(registry.lookup("number").is_none());
        assert!(registry.render("number", &json!(1), None).is_none());
    }

    #[test]
    fn test_lookup_missing() {
        let registry = RendererRegistry::with_builtins();
        assert!(registry.lookup("does-not-exist").is_none());
    }

    #[test]
    fn test_list_names_sorted() {
        let registry = RendererRegistry::new();
        registry.register("zeta", Renderer::new(|_, _| Primitives.text("z")));
        registry.register("alpha", Renderer::new(|_, _| Primitives.text("a")));
        assert_eq!(registry.list_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_reset_restores_builtins() {
        let registry = RendererRegistry::with_builtins();
        let baseline = registry.list_names();

        registry.register("badge", Renderer::new(|_, _| Primitives.text("!")));
        registry.unregister("table");
        registry.reset();

        assert_eq!(registry.list_names(), baseline);
    }
}
