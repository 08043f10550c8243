//! Plugin fetch URLs.

use url::Url;

use crate::catalog::ExtensionRef;
use crate::PluginError;

/// Default route serving pack web plugins
pub const PLUGIN_ROUTE: &str = "/api/packs/web-plugin";

/// Default query parameter carrying the access token
pub const TOKEN_PARAM: &str = "access_token";

/// Builds the URL a plugin module is fetched from.
///
/// The credential travels as a query parameter because module fetches cannot
/// carry custom headers.
#[derive(Debug, Clone)]
pub struct PluginUrlBuilder {
    endpoint: Url,
    token_param: String,
}

impl PluginUrlBuilder {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            token_param: TOKEN_PARAM.to_string(),
        }
    }

    /// Resolve `route` against `base` (which should end with `/`)
    pub fn from_base(base: &Url, route: &str) -> Result<Self, PluginError> {
        Ok(Self::new(base.join(route.trim_start_matches('/'))?))
    }

    pub fn with_token_param(mut self, name: impl Into<String>) -> Self {
        self.token_param = name.into();
        self
    }

    pub fn build(&self, reference: &ExtensionRef, token: Option<&str>) -> Result<Url, PluginError> {
        if self.endpoint.cannot_be_a_base() {
            return Err(PluginError::invalid_url(format!(
                "plugin endpoint {} is not hierarchical",
                self.endpoint
            )));
        }

        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pack_id", &reference.pack_id);
            query.append_pair("path", &reference.path);
            if let Some(v) = reference.updated_at.as_deref() {
                query.append_pair("v", v);
            }
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                query.append_pair(&self.token_param, token);
            }
        }
        Ok(url)
    }
}
