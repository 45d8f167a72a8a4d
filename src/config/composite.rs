//! Layered settings lookup: the first layer that has a key decides its value.

use super::ConfigResult;
use super::provider::ConfigProvider;

/// Stack of providers, highest priority first.
#[derive(Default)]
pub struct CompositeConfigProvider {
    layers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a layer below the ones already present.
    pub fn add_provider(&mut self, layer: Box<dyn ConfigProvider>) {
        self.layers.push(layer);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Like `get_raw`, but also names the layer the value came from.
    pub async fn resolve(&self, key: &str) -> ConfigResult<Option<(&str, String)>> {
        for layer in &self.layers {
            if let Some(value) = layer.get_raw(key).await? {
                return Ok(Some((layer.name(), value)));
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        let resolved = self.resolve(key).await?;
        if let Some((layer, _)) = &resolved {
            tracing::trace!(key, layer = *layer, "Resolved setting");
        }
        Ok(resolved.map(|(_, value)| value))
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.provider_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;

    fn layered() -> CompositeConfigProvider {
        let mut composite = CompositeConfigProvider::new();
        composite.add_provider(Box::new(
            MemoryConfigProvider::named("cli").value("branch", "main"),
        ));
        composite.add_provider(Box::new(
            MemoryConfigProvider::named("file")
                .value("branch", "master")
                .value("host", "https://example.com"),
        ));
        composite
    }

    #[tokio::test]
    async fn test_first_layer_wins() {
        let composite = layered();
        assert_eq!(composite.provider_names(), vec!["cli", "file"]);
        assert_eq!(
            composite.get_raw("branch").await.unwrap().as_deref(),
            Some("main")
        );
        assert_eq!(
            composite.get_raw("host").await.unwrap().as_deref(),
            Some("https://example.com")
        );
        assert_eq!(composite.get_raw("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_names_the_layer() {
        let composite = layered();
        let (layer, value) = composite.resolve("host").await.unwrap().unwrap();
        assert_eq!((layer, value.as_str()), ("file", "https://example.com"));
    }
}
