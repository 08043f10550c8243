//! ext_plugins - Extension pack loading for opsdeck
//!
//! Discovers server-declared packs, fetches the extension modules they ship,
//! and lets each module register renderers into the shared
//! [`RendererRegistry`](ext_renderers::RendererRegistry).
//!
//! # Load sequence
//!
//! ```text
//! trigger_load()
//!   → pack catalog            (failure: nothing loads, still settles)
//!   → extension references    (invalid paths dropped)
//!   → fetch + evaluate + register, one branch per reference, concurrently
//!   → Settled                 (permanent, no automatic retry)
//! ```
//!
//! Concurrent callers share one in-flight sequence. Failures never reach the
//! caller; they are logged and recorded in the [`LoadReport`].
//!
//! Error codes: 9100-9199

pub mod catalog;
pub mod declarative;
pub mod fetcher;
pub mod loader;
pub mod module;
pub mod target;

pub use catalog::{
    decode_packs, extract_references, is_valid_plugin_path, ExtensionRef, HttpPackCatalog,
    PackCatalog, PackRecord,
};
pub use declarative::DeclarativeEvaluator;
pub use fetcher::{HttpModuleFetcher, ModuleEvaluator, ModuleFetcher};
pub use loader::{ExtensionLoader, ExtensionOutcome, LoadReport, LoaderConfig};
pub use module::{entry_fn, Export, PluginEntry, PluginHost, PluginModule};
pub use target::PluginUrlBuilder;

// ============================================================================
// Error Types (Error codes: 9100-9199)
// ============================================================================

/// Error codes for extension loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PluginErrorCode {
    /// Pack catalog could not be fetched or decoded
    Catalog = 9100,
    /// Plugin URL could not be built
    InvalidUrl = 9101,
    /// Module download failed
    Fetch = 9102,
    /// Module body could not be evaluated
    Evaluate = 9103,
    /// Module has no callable registration entry point
    MissingEntryPoint = 9104,
    /// Entry point reported a failure while registering
    Registration = 9105,
    /// Extension did not settle within the configured limit
    Timeout = 9106,
    /// Extension panicked
    Panicked = 9107,
}

/// Extension loading error type
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("[{code}] Pack catalog unavailable: {message}")]
    Catalog { code: u32, message: String },

    #[error("[{code}] Invalid plugin URL: {message}")]
    InvalidUrl { code: u32, message: String },

    #[error("[{code}] Module fetch failed: {message}")]
    Fetch { code: u32, message: String },

    #[error("[{code}] Module evaluation failed: {message}")]
    Evaluate { code: u32, message: String },

    #[error("[{code}] No registration entry point: {message}")]
    MissingEntryPoint { code: u32, message: String },

    #[error("[{code}] Registration failed: {message}")]
    Registration { code: u32, message: String },

    #[error("[{code}] Timed out: {message}")]
    Timeout { code: u32, message: String },

    #[error("[{code}] Panicked: {message}")]
    Panicked { code: u32, message: String },
}

impl PluginError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            code: PluginErrorCode::Catalog as u32,
            message: message.into(),
        }
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            code: PluginErrorCode::InvalidUrl as u32,
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            code: PluginErrorCode::Fetch as u32,
            message: message.into(),
        }
    }

    pub fn evaluate(message: impl Into<String>) -> Self {
        Self::Evaluate {
            code: PluginErrorCode::Evaluate as u32,
            message: message.into(),
        }
    }

    pub fn missing_entry_point(message: impl Into<String>) -> Self {
        Self::MissingEntryPoint {
            code: PluginErrorCode::MissingEntryPoint as u32,
            message: message.into(),
        }
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            code: PluginErrorCode::Registration as u32,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            code: PluginErrorCode::Timeout as u32,
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            code: PluginErrorCode::Panicked as u32,
            message: message.into(),
        }
    }

    /// Numeric code of this error
    pub fn code(&self) -> u32 {
        match self {
            Self::Catalog { code, .. }
            | Self::InvalidUrl { code, .. }
            | Self::Fetch { code, .. }
            | Self::Evaluate { code, .. }
            | Self::MissingEntryPoint { code, .. }
            | Self::Registration { code, .. }
            | Self::Timeout { code, .. }
            | Self::Panicked { code, .. } => *code,
        }
    }
}

impl From<url::ParseError> for PluginError {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_url(e.to_string())
    }
}
