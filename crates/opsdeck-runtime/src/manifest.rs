//! Host configuration (`opsdeck.toml`)
//!
//! Every section and field is optional; unset values fall back to the
//! defaults documented on each field.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ext_menu::MenuLayout;
use serde::Deserialize;

/// Host manifest
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Manifest {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub plugins: Plugins,
    #[serde(default)]
    pub menu: Menu,
}

/// Dashboard API connection
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Server {
    /// API base URL (default: "http://127.0.0.1:8080")
    pub base_url: Option<String>,
    /// Request timeout in milliseconds (default: 10000, 0 disables)
    pub timeout_ms: Option<u64>,
}

/// Extension loading
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Plugins {
    /// Load extension packs at all (default: true)
    pub enabled: Option<bool>,
    /// Pack catalog route (default: "/api/packs")
    pub catalog_route: Option<String>,
    /// Plugin serving route (default: "/api/packs/web-plugin")
    pub plugin_route: Option<String>,
    /// Query parameter carrying the credential (default: "access_token")
    pub token_param: Option<String>,
    /// Per-extension limit in milliseconds (default: 30000, 0 disables)
    pub timeout_ms: Option<u64>,
}

/// Menu composition
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Menu {
    /// Descriptor catalog route (default: "/api/functions")
    pub descriptors_route: Option<String>,
    /// Static navigation tree file, overridden by `--nav`
    pub nav_file: Option<String>,
    #[serde(flatten)]
    pub layout: MenuLayout,
}

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

fn millis(value: Option<u64>, default: u64) -> Option<Duration> {
    match value.unwrap_or(default) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

impl Manifest {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("parsing manifest")
    }

    /// Read a manifest; a missing file yields the defaults when `required` is false
    pub async fn load(path: &Path, required: bool) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(source) => Self::from_toml(&source),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no manifest at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("reading manifest at {}", path.display())),
        }
    }
}

impl Server {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        millis(self.timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS)
    }
}

impl Plugins {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn catalog_route(&self) -> &str {
        self.catalog_route
            .as_deref()
            .unwrap_or(ext_plugins::catalog::PACKS_ROUTE)
    }

    pub fn plugin_route(&self) -> &str {
        self.plugin_route
            .as_deref()
            .unwrap_or(ext_plugins::target::PLUGIN_ROUTE)
    }

    pub fn token_param(&self) -> &str {
        self.token_param
            .as_deref()
            .unwrap_or(ext_plugins::target::TOKEN_PARAM)
    }

    pub fn plugin_timeout(&self) -> Option<Duration> {
        let default = ext_plugins::loader::DEFAULT_PLUGIN_TIMEOUT.as_millis() as u64;
        millis(self.timeout_ms, default)
    }
}

impl Menu {
    pub fn descriptors_route(&self) -> &str {
        self.descriptors_route
            .as_deref()
            .unwrap_or(ext_menu::descriptor::FUNCTIONS_ROUTE)
    }
}
