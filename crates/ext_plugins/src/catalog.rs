//! Pack catalog and extension reference extraction.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use ext_api::{lenient, ApiClient, ListEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::PluginError;

/// Default route of the pack catalog
pub const PACKS_ROUTE: &str = "/api/packs";

/// One pack as returned by the catalog endpoint.
///
/// Fields are kept loose; the server owns the schema and anything
/// unexpected is dropped during extraction instead of failing the decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub manifest: Option<PackManifest>,
    #[serde(default)]
    pub updated_at: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackManifest {
    #[serde(default, deserialize_with = "lenient")]
    pub web_plugins: Option<Vec<Value>>,
}

impl PackRecord {
    /// Pack id as a string; numeric ids are accepted
    pub fn pack_id(&self) -> Option<String> {
        scalar_string(self.id.as_ref()?)
    }

    /// Cache-busting version token
    pub fn version_token(&self) -> Option<String> {
        scalar_string(self.updated_at.as_ref()?)
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A loadable unit of extension code inside a pack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtensionRef {
    pub pack_id: String,
    pub path: String,
    pub updated_at: Option<String>,
}

impl fmt::Display for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pack_id, self.path)
    }
}

/// Whether `path` is an acceptable relative module path.
///
/// The server validates paths already; this guards against anything that
/// could escape the pack or point at another origin.
pub fn is_valid_plugin_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains("://")
        && !path.split('/').any(|segment| segment == "..")
}

/// Flatten pack records into extension references.
///
/// Packs without an id are skipped, invalid paths are dropped, and a path
/// listed twice in the same pack yields one reference.
pub fn extract_references(packs: &[PackRecord]) -> Vec<ExtensionRef> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for pack in packs {
        let Some(pack_id) = pack.pack_id() else {
            continue;
        };
        let Some(plugins) = pack.manifest.as_ref().and_then(|m| m.web_plugins.as_ref()) else {
            continue;
        };
        let updated_at = pack.version_token();

        for entry in plugins {
            let Some(path) = entry.as_str().map(str::trim) else {
                continue;
            };
            if !is_valid_plugin_path(path) {
                debug!(pack = %pack_id, path, "dropping invalid plugin path");
                continue;
            }
            if seen.insert((pack_id.clone(), path.to_string())) {
                references.push(ExtensionRef {
                    pack_id: pack_id.clone(),
                    path: path.to_string(),
                    updated_at: updated_at.clone(),
                });
            }
        }
    }

    references
}

/// Read access to the server's pack catalog
#[async_trait]
pub trait PackCatalog: Send + Sync {
    async fn list_packs(&self) -> Result<Vec<PackRecord>, PluginError>;
}

/// Pack catalog backed by the dashboard API
#[derive(Debug, Clone)]
pub struct HttpPackCatalog {
    api: ApiClient,
    route: String,
}

impl HttpPackCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self::with_route(api, PACKS_ROUTE)
    }

    pub fn with_route(api: ApiClient, route: impl Into<String>) -> Self {
        Self {
            api,
            route: route.into(),
        }
    }
}

#[async_trait]
impl PackCatalog for HttpPackCatalog {
    async fn list_packs(&self) -> Result<Vec<PackRecord>, PluginError> {
        let envelope: ListEnvelope<Value> = self
            .api
            .get_json(&self.route)
            .await
            .map_err(|e| PluginError::catalog(e.to_string()))?;
        Ok(decode_packs(envelope))
    }
}

/// Decode a catalog response pack by pack; a damaged pack never fails the list
pub fn decode_packs(envelope: ListEnvelope<Value>) -> Vec<PackRecord> {
    envelope.decode_each()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn packs(value: Value) -> Vec<PackRecord> {
        decode_packs(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_path_validation() {
        assert!(is_valid_plugin_path("web/index.json"));
        assert!(is_valid_plugin_path("plugin.js"));
        assert!(!is_valid_plugin_path(""));
        assert!(!is_valid_plugin_path("/etc/passwd"));
        assert!(!is_valid_plugin_path("../other/pack.js"));
        assert!(!is_valid_plugin_path("web/../../x.js"));
        assert!(!is_valid_plugin_path("https://evil.example/x.js"));
        assert!(!is_valid_plugin_path("web\\x.js"));
    }

    #[test]
    fn test_extract_references() {
        let packs = packs(json!([
            {
                "id": "loot",
                "updated_at": "2024-05-01T10:00:00Z",
                "manifest": {"web_plugins": ["ui/main.json", "  ", 42, "/abs.js", "ui/main.json"]}
            },
            {"id": 7, "manifest": {"web_plugins": ["a.json"]}},
            {"manifest": {"web_plugins": ["orphan.json"]}},
            {"id": "empty", "manifest": {}},
            {"id": "bare"}
        ]));

        let refs = extract_references(&packs);
        assert_eq!(
            refs,
            vec![
                ExtensionRef {
                    pack_id: "loot".to_string(),
                    path: "ui/main.json".to_string(),
                    updated_at: Some("2024-05-01T10:00:00Z".to_string()),
                },
                ExtensionRef {
                    pack_id: "7".to_string(),
                    path: "a.json".to_string(),
                    updated_at: None,
                },
            ]
        );
    }

    #[test]
    fn test_damaged_pack_does_not_hide_others() {
        let packs = packs(json!([
            {"id": "good", "manifest": {"web_plugins": ["ui/main.json"]}},
            {"id": "bad", "manifest": {"web_plugins": "ui/x.json"}},
            {"id": "worse", "manifest": "not an object"},
            null,
            "junk"
        ]));
        assert_eq!(packs.len(), 3);
        assert!(packs[1].manifest.as_ref().unwrap().web_plugins.is_none());
        assert!(packs[2].manifest.is_none());

        let refs = extract_references(&packs);
        assert_eq!(
            refs,
            vec![ExtensionRef {
                pack_id: "good".to_string(),
                path: "ui/main.json".to_string(),
                updated_at: None,
            }]
        );
    }

    #[test]
    fn test_items_envelope() {
        let packs = packs(json!({"items": [{"id": "p", "manifest": {"web_plugins": ["x.json"]}}]}));
        assert_eq!(extract_references(&packs).len(), 1);
    }

    #[test]
    fn test_reference_display() {
        let r = ExtensionRef {
            pack_id: "p".to_string(),
            path: "ui/x.json".to_string(),
            updated_at: None,
        };
        assert_eq!(r.to_string(), "p/ui/x.json");
    }
}
