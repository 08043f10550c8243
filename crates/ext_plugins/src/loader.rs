//! Single-flight extension loader.
//!
//! The load state is an explicit machine:
//!
//! ```text
//! NotStarted ──trigger_load──▶ InFlight(shared) ──all branches settled──▶ Settled
//! ```
//!
//! The `NotStarted → InFlight` transition happens under a mutex, so exactly
//! one sequence runs no matter how many callers race. The sequence itself
//! runs in a spawned task; a caller that stops waiting does not stall
//! settlement for everyone else.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ext_api::CredentialSource;
use ext_renderers::RendererRegistry;
use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::{extract_references, ExtensionRef, PackCatalog};
use crate::fetcher::ModuleFetcher;
use crate::module::PluginHost;
use crate::target::PluginUrlBuilder;
use crate::PluginError;

/// Default upper bound for one extension's fetch, evaluation and registration
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Loader tuning
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Per-extension limit; `None` waits forever
    pub plugin_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            plugin_timeout: Some(DEFAULT_PLUGIN_TIMEOUT),
        }
    }
}

/// Result of one extension attempt
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionOutcome {
    pub reference: ExtensionRef,
    /// Rendered error, `None` on success
    pub error: Option<String>,
}

impl ExtensionOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a settled load sequence
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Set when the pack catalog could not be read
    pub catalog_error: Option<String>,
    pub extensions: Vec<ExtensionOutcome>,
}

impl LoadReport {
    fn aborted(reason: impl Into<String>) -> Self {
        Self {
            catalog_error: Some(reason.into()),
            extensions: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.extensions.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.extensions.len() - self.succeeded()
    }
}

type SharedLoad = Shared<BoxFuture<'static, ()>>;

enum LoadPhase {
    NotStarted,
    InFlight(SharedLoad),
    Settled,
}

struct LoaderInner {
    catalog: Arc<dyn PackCatalog>,
    fetcher: Arc<dyn ModuleFetcher>,
    targets: PluginUrlBuilder,
    credentials: Arc<dyn CredentialSource>,
    registry: Arc<RendererRegistry>,
    config: LoaderConfig,
    phase: Mutex<LoadPhase>,
    report: Mutex<Option<LoadReport>>,
}

/// Loads server-declared extensions into a renderer registry, at most once.
///
/// Cloning yields another handle to the same loader.
#[derive(Clone)]
pub struct ExtensionLoader {
    inner: Arc<LoaderInner>,
}

impl ExtensionLoader {
    pub fn new(
        catalog: Arc<dyn PackCatalog>,
        fetcher: Arc<dyn ModuleFetcher>,
        targets: PluginUrlBuilder,
        credentials: Arc<dyn CredentialSource>,
        registry: Arc<RendererRegistry>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                catalog,
                fetcher,
                targets,
                credentials,
                registry,
                config,
                phase: Mutex::new(LoadPhase::NotStarted),
                report: Mutex::new(None),
            }),
        }
    }

    /// Run the load sequence once; later and concurrent calls share it.
    ///
    /// Never fails. Must be called from within a tokio runtime.
    pub async fn trigger_load(&self) {
        let pending = {
            let mut phase = lock(&self.inner.phase);
            match &*phase {
                LoadPhase::Settled => {
                    debug!("extensions already loaded");
                    return;
                }
                LoadPhase::InFlight(shared) => shared.clone(),
                LoadPhase::NotStarted => {
                    debug!("starting extension load");
                    let inner = Arc::clone(&self.inner);
                    let task = tokio::spawn(inner.run());
                    let shared = task.map(|_| ()).boxed().shared();
                    *phase = LoadPhase::InFlight(shared.clone());
                    shared
                }
            }
        };
        pending.await;
    }

    /// True once the first sequence has settled, whatever its outcome
    pub fn is_loaded(&self) -> bool {
        matches!(*lock(&self.inner.phase), LoadPhase::Settled)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(*lock(&self.inner.phase), LoadPhase::InFlight(_))
    }

    /// Report of the settled sequence, if any
    pub fn last_report(&self) -> Option<LoadReport> {
        lock(&self.inner.report).clone()
    }

    pub fn registry(&self) -> &Arc<RendererRegistry> {
        &self.inner.registry
    }

    /// Forget a settled load so the next trigger runs again.
    ///
    /// Refused (returns false) while a sequence is in flight. Registrations
    /// made by earlier loads stay in the registry.
    pub fn reset(&self) -> bool {
        let mut phase = lock(&self.inner.phase);
        if matches!(*phase, LoadPhase::InFlight(_)) {
            return false;
        }
        *phase = LoadPhase::NotStarted;
        *lock(&self.inner.report) = None;
        true
    }
}

impl std::fmt::Debug for ExtensionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionLoader")
            .field("loaded", &self.is_loaded())
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}

impl LoaderInner {
    async fn run(self: Arc<Self>) {
        let report = match AssertUnwindSafe(self.load_all()).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(error = %message, "extension load sequence panicked");
                LoadReport::aborted(message)
            }
        };

        info!(
            loaded = report.succeeded(),
            failed = report.failed(),
            catalog_ok = report.catalog_error.is_none(),
            "extension load settled"
        );

        *lock(&self.report) = Some(report);
        *lock(&self.phase) = LoadPhase::Settled;
    }

    async fn load_all(&self) -> LoadReport {
        let packs = match self.catalog.list_packs().await {
            Ok(packs) => packs,
            Err(e) => {
                warn!(error = %e, "pack catalog unavailable, no extensions loaded");
                return LoadReport::aborted(e.to_string());
            }
        };

        let references = extract_references(&packs);
        debug!(
            packs = packs.len(),
            extensions = references.len(),
            "extension references resolved"
        );

        let extensions = join_all(references.into_iter().map(|r| self.attempt(r))).await;
        LoadReport {
            catalog_error: None,
            extensions,
        }
    }

    /// One isolated branch: errors, panics and timeouts stay inside it
    async fn attempt(&self, reference: ExtensionRef) -> ExtensionOutcome {
        let work = AssertUnwindSafe(self.load_one(&reference)).catch_unwind();
        let settled = match self.config.plugin_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(settled) => settled,
                Err(_) => Ok(Err(PluginError::timeout(format!(
                    "{reference} did not settle within {}ms",
                    limit.as_millis()
                )))),
            },
            None => work.await,
        };

        let result = settled.unwrap_or_else(|panic| {
            Err(PluginError::panicked(format!(
                "{reference}: {}",
                panic_message(panic.as_ref())
            )))
        });

        match &result {
            Ok(()) => debug!(extension = %reference, "extension registered"),
            Err(e) => warn!(extension = %reference, error = %e, "extension failed to load"),
        }

        ExtensionOutcome {
            reference,
            error: result.err().map(|e| e.to_string()),
        }
    }

    async fn load_one(&self, reference: &ExtensionRef) -> Result<(), PluginError> {
        let token = self.credentials.access_token();
        let url = self.targets.build(reference, token.as_deref())?;
        let module = self.fetcher.fetch_module(&url, reference).await?;
        let entry = module.entry_point()?;
        let host = PluginHost::new(Arc::clone(&self.registry));
        entry.register(&host).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
