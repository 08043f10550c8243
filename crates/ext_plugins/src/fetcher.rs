//! Module fetch and evaluation seams.

use std::sync::Arc;

use async_trait::async_trait;
use ext_api::ApiClient;
use url::Url;

use crate::catalog::ExtensionRef;
use crate::declarative::DeclarativeEvaluator;
use crate::module::PluginModule;
use crate::PluginError;

/// Turns a fetched module body into an evaluated module
pub trait ModuleEvaluator: Send + Sync {
    fn evaluate(&self, source: &str, reference: &ExtensionRef) -> Result<PluginModule, PluginError>;
}

/// Fetch-and-evaluate primitive used by the loader.
///
/// Receives the fully built URL (credential included); implementations must
/// not log it verbatim.
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    async fn fetch_module(
        &self,
        url: &Url,
        reference: &ExtensionRef,
    ) -> Result<PluginModule, PluginError>;
}

/// Downloads module bodies over HTTP and evaluates them
pub struct HttpModuleFetcher {
    api: ApiClient,
    evaluator: Arc<dyn ModuleEvaluator>,
}

impl HttpModuleFetcher {
    /// Fetcher evaluating declarative JSON modules
    pub fn new(api: ApiClient) -> Self {
        Self::with_evaluator(api, Arc::new(DeclarativeEvaluator))
    }

    pub fn with_evaluator(api: ApiClient, evaluator: Arc<dyn ModuleEvaluator>) -> Self {
        Self { api, evaluator }
    }
}

#[async_trait]
impl ModuleFetcher for HttpModuleFetcher {
    async fn fetch_module(
        &self,
        url: &Url,
        reference: &ExtensionRef,
    ) -> Result<PluginModule, PluginError> {
        let source = self
            .api
            .get_text(url)
            .await
            .map_err(|e| PluginError::fetch(format!("{reference}: {e}")))?;
        self.evaluator.evaluate(&source, reference)
    }
}
