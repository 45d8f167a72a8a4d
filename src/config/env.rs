//! Settings from `PLUGSYNC_*` environment variables.
//!
//! A key maps to its upper-cased name behind the prefix, with dots turned
//! into underscores: `plugins_root` is read from `PLUGSYNC_PLUGINS_ROOT`.
//! An empty variable counts as unset.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

pub const ENV_PREFIX: &str = "PLUGSYNC_";

/// Read-only view of the process environment.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::prefixed(ENV_PREFIX)
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.variable(key)) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }
}
