use std::path::PathBuf;

/// Failure of a single plugin's fetch → extract → normalize pipeline.
///
/// These never abort a batch; the orchestrator records them against the
/// plugin name and moves on.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Network request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Archive transfer failed with HTTP {status}")]
    Transfer { status: u16 },

    #[error("Failed to extract entry '{entry}': {cause}")]
    Extract { entry: String, cause: String },

    #[error("Failed to normalize plugin layout: {0}")]
    Normalize(#[source] std::io::Error),

    #[error("Failed to prepare install directory {path}: {source}")]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid plugin name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid plugin source '{source_locator}': {reason}")]
    InvalidSource {
        source_locator: String,
        reason: String,
    },

    #[error("Duplicate plugin name '{name}'")]
    DuplicateName { name: String },
}

impl PluginError {
    pub fn extract(entry: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        PluginError::Extract {
            entry: entry.into(),
            cause: cause.to_string(),
        }
    }

    /// Short machine-friendly label, used in reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PluginError::Network(_) => "network",
            PluginError::Transfer { .. } => "transfer",
            PluginError::Extract { .. } => "extract",
            PluginError::Normalize(_) => "normalize",
            PluginError::Install { .. } => "install",
            PluginError::InvalidName { .. } => "invalid_name",
            PluginError::InvalidSource { .. } => "invalid_source",
            PluginError::DuplicateName { .. } => "duplicate_name",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            PluginError::Transfer { status } => Some(*status),
            PluginError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Transport-level failures that may succeed on a later run.
    pub fn is_transient(&self) -> bool {
        match self {
            PluginError::Network(_) => true,
            PluginError::Transfer { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
