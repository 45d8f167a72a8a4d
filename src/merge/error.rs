use std::path::PathBuf;

/// Failures reading or writing the editor configuration file.
///
/// Unlike per-plugin errors these are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write configuration file {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            MergeError::ConfigRead { path, .. } | MergeError::ConfigWrite { path, .. } => path,
        }
    }
}
