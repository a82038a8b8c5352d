//! Source / provider contract between the configuration builder and its layers

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::ConfigData;
use crate::error::ConfigError;

/// A loaded (or loadable) layer of configuration data.
///
/// `load` rebuilds the layer; reads between loads see one stable snapshot.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Populate or refresh the snapshot
    async fn load(&self) -> Result<(), ConfigError>;

    /// Currently published data
    fn snapshot(&self) -> Arc<ConfigData>;

    /// Case-insensitive lookup; outer `None` = not found, inner `None` = no value
    fn try_get(&self, key: &str) -> Option<Option<String>> {
        self.snapshot()
            .get(key)
            .map(|value| value.map(str::to_owned))
    }
}

/// Declarative descriptor the builder turns into a provider
pub trait ConfigurationSource: Send + Sync {
    fn name(&self) -> &str;

    fn build(&self) -> Arc<dyn ConfigurationProvider>;
}
