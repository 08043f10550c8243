//! Function descriptors and the catalog they come from.

use async_trait::async_trait;
use ext_api::{lenient, ApiClient, ListEnvelope};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::MenuError;

/// Default route of the descriptor catalog
pub const FUNCTIONS_ROUTE: &str = "/api/functions";

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return Ok(None),
    };
    Ok((!id.trim().is_empty()).then_some(id))
}

/// Localized label
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DisplayName {
    #[serde(default, deserialize_with = "lenient")]
    pub zh: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub en: Option<String>,
}

/// Optional navigation placement
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MenuMeta {
    #[serde(default, deserialize_with = "lenient")]
    pub order: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub hidden: Option<bool>,
}

/// A server-declared invocable function
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FunctionDescriptor {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<DisplayName>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub menu: Option<MenuMeta>,
}

impl FunctionDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Label in `zh → en → id` order, skipping blanks
    pub fn label(&self) -> Option<String> {
        let names = self.display_name.as_ref();
        [
            names.and_then(|n| n.zh.as_deref()),
            names.and_then(|n| n.en.as_deref()),
            self.id.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
    }

    pub fn is_hidden(&self) -> bool {
        self.menu.as_ref().and_then(|m| m.hidden) == Some(true)
    }
}

/// Read access to the function descriptor catalog
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    async fn list_descriptors(&self) -> Result<Vec<FunctionDescriptor>, MenuError>;
}

/// Descriptor catalog backed by the dashboard API
#[derive(Debug, Clone)]
pub struct HttpDescriptorSource {
    api: ApiClient,
    route: String,
}

impl HttpDescriptorSource {
    pub fn new(api: ApiClient) -> Self {
        Self::with_route(api, FUNCTIONS_ROUTE)
    }

    pub fn with_route(api: ApiClient, route: impl Into<String>) -> Self {
        Self {
            api,
            route: route.into(),
        }
    }
}

#[async_trait]
impl DescriptorSource for HttpDescriptorSource {
    async fn list_descriptors(&self) -> Result<Vec<FunctionDescriptor>, MenuError> {
        let envelope: ListEnvelope<Value> = self
            .api
            .get_json(&self.route)
            .await
            .map_err(|e| MenuError::descriptor_fetch(e.to_string()))?;
        Ok(decode_descriptors(envelope))
    }
}

/// Decode a descriptor list row by row; rows that are not objects are dropped
pub fn decode_descriptors(envelope: ListEnvelope<Value>) -> Vec<FunctionDescriptor> {
    envelope.decode_each()
}
