//! # plugsync
//!
//! Installs Neovim plugins from GitHub source archives into a lazy.nvim
//! plugins directory, then makes sure each one is referenced from the
//! `lazy.setup({ ... })` block of the init file.
//!
//! ```rust,no_run
//! use plugsync::{PluginRef, SyncConfig, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plugsync::Error> {
//!     let config = SyncConfig::new("/home/me/.local/share/nvim/lazy", "/home/me/.config/nvim/init.lua")
//!         .plugins(vec![PluginRef::new("tokyonight.nvim", "folke/tokyonight.nvim")]);
//!
//!     let report = SyncOrchestrator::with_http(config)?.run().await?;
//!     for (name, error) in report.failures() {
//!         eprintln!("{name}: {error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The pipeline per plugin is fetch → extract → normalize; the init file is
//! merged once for the whole batch. See [`sync`] for failure semantics.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod archive;
pub mod client;
pub mod config;
pub mod merge;
pub mod observability;
pub mod plugins;
pub mod sync;

pub use archive::{ExtractSummary, Extractor, LayoutNormalizer, NormalizeOutcome};
pub use client::{ArchiveFetcher, ArchiveStream, FetchOptions, HttpArchiveFetcher};
pub use config::{ConfigBuilder, ConfigError, InstallMode, MergePolicy, SyncConfig};
pub use merge::{ConfigMerger, MergeError, MergeOutcome};
pub use observability::{TracingConfig, TracingLevel, init_tracing};
pub use plugins::{InstallDirectory, PluginError, PluginRef};
pub use sync::{PluginOutcome, PluginReport, SyncError, SyncOrchestrator, SyncReport};

/// Error type for plugsync operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be set up or a request failed outright.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or invalid.
    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    /// A single plugin could not be installed.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// The init file could not be read or rewritten.
    #[error("Config merge failed: {0}")]
    Merge(#[from] MergeError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Settings, names and locators that need fixing before a rerun helps
    Configuration,
    /// Network or server-side failures that may succeed on retry
    Transient,
    /// Local disk problems (permissions, missing files, full disks)
    Filesystem,
    /// Malformed data and unexpected states
    Internal,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::Env(_) => ErrorCategory::Configuration,
            Error::Network(_) => ErrorCategory::Transient,
            Error::Io(_) | Error::Merge(_) => ErrorCategory::Filesystem,
            Error::Json(_) => ErrorCategory::Internal,

            Error::Plugin(e) if e.is_transient() => ErrorCategory::Transient,
            Error::Plugin(
                PluginError::InvalidName { .. }
                | PluginError::InvalidSource { .. }
                | PluginError::DuplicateName { .. },
            ) => ErrorCategory::Configuration,
            Error::Plugin(PluginError::Install { .. } | PluginError::Normalize(_)) => {
                ErrorCategory::Filesystem
            }
            Error::Plugin(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Plugin(e) => e.status_code(),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::MissingFile { path } => {
                Error::Config(format!("Settings file not found: {}", path.display()))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Env(e),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

impl From<SyncError> for Error {
    fn from(err: SyncError) -> Self {
        Error::Merge(err.source)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
