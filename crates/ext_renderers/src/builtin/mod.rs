//! Built-in renderers seeded into every registry.
//!
//! Each renderer module adds itself to [`BUILTIN_RENDERERS`] at link time, so
//! adding a built-in never requires touching the registry.

use serde_json::Value;

use crate::view::View;

mod json;
mod number;
mod table;
mod text;

/// A built-in renderer and the alias names it is also reachable under
#[derive(Clone, Copy)]
pub struct BuiltinRenderer {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub render: fn(&Value, Option<&Value>) -> View,
}

impl std::fmt::Debug for BuiltinRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinRenderer")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish()
    }
}

/// Distributed slice collecting built-in renderers at compile time
#[linkme::distributed_slice]
pub static BUILTIN_RENDERERS: [fn() -> BuiltinRenderer];

/// Collect all built-ins from the distributed slice
pub fn collect_builtins() -> Vec<BuiltinRenderer> {
    let mut builtins: Vec<BuiltinRenderer> = BUILTIN_RENDERERS.iter().map(|f| f()).collect();
    builtins.sort_by_key(|b| b.name);
    builtins
}

fn option_bool(options: Option<&Value>, key: &str) -> Option<bool> {
    options.and_then(|o| o.get(key)).and_then(Value::as_bool)
}

fn option_u32(options: Option<&Value>, key: &str) -> Option<u32> {
    options
        .and_then(|o| o.get(key))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}
