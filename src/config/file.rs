//! Settings from a JSON file.
//!
//! ```json
//! {
//!   "plugins_root": "~/.local/share/nvim/lazy",
//!   "init_file": "~/.config/nvim/init.lua",
//!   "branch": "master",
//!   "plugins": [
//!     { "name": "tokyonight.nvim", "repo": "folke/tokyonight.nvim" },
//!     { "name": "nvim-treesitter", "repo": "nvim-treesitter/nvim-treesitter", "branch": "main" }
//!   ]
//! }
//! ```
//!
//! The file is read on the first lookup and kept for the provider's lifetime.
//! Keys may use dots to reach into nested objects.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::OnceCell;

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

pub struct FileConfigProvider {
    path: PathBuf,
    document: OnceCell<Value>,
    required: bool,
}

impl FileConfigProvider {
    /// A missing file reads as an empty document.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: OnceCell::new(),
            required: false,
        }
    }

    /// A missing file is a [`ConfigError::MissingFile`].
    pub fn required(path: PathBuf) -> Self {
        Self {
            required: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> ConfigResult<Value> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    return Err(ConfigError::MissingFile {
                        path: self.path.clone(),
                    });
                }
                tracing::debug!(path = %self.path.display(), "No settings file");
                return Ok(Value::Null);
            }
            Err(e) => return Err(e.into()),
        };

        let document: Value = serde_json::from_str(&text)?;
        if !document.is_object() {
            return Err(ConfigError::InvalidValue {
                key: self.path.display().to_string(),
                message: "settings file must contain a JSON object".into(),
            });
        }
        tracing::debug!(path = %self.path.display(), "Loaded settings file");
        Ok(document)
    }
}

#[async_trait::async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        let document = self.document.get_or_try_init(|| self.read()).await?;

        let found = key
            .split('.')
            .try_fold(document, |node, part| node.get(part));
        Ok(match found {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        })
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("required", &self.required)
            .field("loaded", &self.document.initialized())
            .finish()
    }
}
