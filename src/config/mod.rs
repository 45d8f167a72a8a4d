//! Where settings come from.
//!
//! Each source is a [`ConfigProvider`]; [`ConfigBuilder`] stacks them so the
//! first one holding a key wins. The binary stacks command line, environment
//! and settings file, in that order.
//!
//! ```rust,no_run
//! use plugsync::config::{ConfigBuilder, SyncConfig};
//!
//! # async fn example() -> Result<(), plugsync::ConfigError> {
//! let provider = ConfigBuilder::new()
//!     .env()
//!     .file("plugsync.json")
//!     .build();
//! let config = SyncConfig::from_provider(&provider).await?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod file;
pub mod memory;
pub mod provider;
pub mod settings;

pub use composite::CompositeConfigProvider;
pub use env::{ENV_PREFIX, EnvConfigProvider};
pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};
pub use settings::{
    InstallMode, MergePolicy, SyncConfig, default_init_file, default_plugins_root,
    default_settings_file, expand_home, keys,
};

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No source has the key and it has no default.
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// `--config` named a file that does not exist.
    #[error("Settings file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Malformed settings: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

/// Every problem `SyncConfig::validate` found, reported together.
#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Invalid settings: ")?;
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Stacks providers from highest to lowest priority.
#[derive(Default)]
pub struct ConfigBuilder {
    layers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PLUGSYNC_*` environment variables.
    pub fn env(self) -> Self {
        self.provider(Box::new(EnvConfigProvider::default()))
    }

    /// Optional settings file; missing reads as empty.
    pub fn file(self, path: impl AsRef<Path>) -> Self {
        self.provider(Box::new(FileConfigProvider::new(path.as_ref().to_path_buf())))
    }

    /// Settings file that must exist.
    pub fn required_file(self, path: impl AsRef<Path>) -> Self {
        self.provider(Box::new(FileConfigProvider::required(
            path.as_ref().to_path_buf(),
        )))
    }

    pub fn memory(self, provider: MemoryConfigProvider) -> Self {
        self.provider(Box::new(provider))
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.layers.push(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        let mut composite = CompositeConfigProvider::new();
        for layer in self.layers {
            composite.add_provider(layer);
        }
        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_list_every_key() {
        let err = ConfigError::ValidationErrors(ValidationErrors(vec![
            ConfigError::InvalidValue {
                key: "branch".into(),
                message: "must not be empty".into(),
            },
            ConfigError::InvalidValue {
                key: "host".into(),
                message: "bad".into(),
            },
        ]));
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid settings: "));
        assert!(msg.contains("branch: must not be empty; "));
        assert!(msg.contains("host: bad"));
    }

    #[tokio::test]
    async fn test_builder_order_is_priority() {
        let provider = ConfigBuilder::new()
            .memory(MemoryConfigProvider::named("cli").value(keys::BRANCH, "main"))
            .env()
            .file("does-not-exist/plugsync.json")
            .build();
        assert_eq!(provider.provider_names(), vec!["cli", "env", "file"]);
        assert_eq!(
            provider.get_raw(keys::BRANCH).await.unwrap().as_deref(),
            Some("main")
        );
    }
}
