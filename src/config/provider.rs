//! Configuration Provider Trait

use serde::de::DeserializeOwned;

use super::{ConfigError, ConfigResult};

/// Core configuration provider trait
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Get a raw configuration value
    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;
}

/// Extension methods for typed configuration access
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a typed configuration value.
    ///
    /// Raw values are parsed as JSON first; a value that is not valid JSON is
    /// taken as a bare string, so `PLUGSYNC_BRANCH=main` works unquoted.
    fn get<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        Self: Sync,
    {
        async move {
            let Some(raw) = self.get_raw(key).await? else {
                return Ok(None);
            };
            let value = serde_json::from_str::<serde_json::Value>(&raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
            let typed = serde_json::from_value(value)
                .or_else(|_| serde_json::from_value(serde_json::Value::String(raw)))
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })?;
            Ok(Some(typed))
        }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}
