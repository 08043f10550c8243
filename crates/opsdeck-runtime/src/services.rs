//! Service wiring
//!
//! Builds the renderer registry, the extension loader and the descriptor
//! catalog from the manifest and hands them out by `Arc`. Nothing here is
//! global; tests build their own instances.

use std::sync::Arc;

use anyhow::{Context, Result};
use ext_api::{ApiClient, CredentialSource};
use ext_menu::{DescriptorSource, HttpDescriptorSource, MenuLayout};
use ext_plugins::{
    ExtensionLoader, HttpModuleFetcher, HttpPackCatalog, LoaderConfig, PluginUrlBuilder,
};
use ext_renderers::RendererRegistry;

use crate::manifest::Manifest;

/// Long-lived host services
pub struct Services {
    pub registry: Arc<RendererRegistry>,
    pub loader: ExtensionLoader,
    pub descriptors: Arc<dyn DescriptorSource>,
    pub layout: MenuLayout,
    pub plugins_enabled: bool,
}

impl Services {
    pub fn build(manifest: &Manifest, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let api = ApiClient::new(
            manifest.server.base_url(),
            credentials.clone(),
            manifest.server.request_timeout(),
        )
        .context("creating API client")?;

        let registry = Arc::new(RendererRegistry::with_builtins());

        let targets = PluginUrlBuilder::from_base(api.base_url(), manifest.plugins.plugin_route())
            .context("resolving plugin route")?
            .with_token_param(manifest.plugins.token_param());

        let loader = ExtensionLoader::new(
            Arc::new(HttpPackCatalog::with_route(
                api.clone(),
                manifest.plugins.catalog_route(),
            )),
            Arc::new(HttpModuleFetcher::new(api.clone())),
            targets,
            credentials,
            registry.clone(),
            LoaderConfig {
                plugin_timeout: manifest.plugins.plugin_timeout(),
            },
        );

        let descriptors = Arc::new(HttpDescriptorSource::with_route(
            api,
            manifest.menu.descriptors_route(),
        ));

        tracing::debug!(
            base_url = manifest.server.base_url(),
            renderers = registry.len(),
            "services ready"
        );

        Ok(Self {
            registry,
            loader,
            descriptors,
            layout: manifest.menu.layout.clone(),
            plugins_enabled: manifest.plugins.enabled(),
        })
    }
}
