//! 配置构建器
//!
//! Sources are layered in registration order: a key defined by a later source
//! overrides the same key from an earlier one.

use std::path::PathBuf;
use std::sync::Arc;

use figment::Figment;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::figment_source::FigmentSource;
use crate::source::{ConfigurationProvider, ConfigurationSource};

/// Ordered list of configuration sources
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; it overrides every source added before it
    pub fn add<S>(&mut self, source: S) -> &mut Self
    where
        S: ConfigurationSource + 'static,
    {
        debug!(source = source.name(), position = self.sources.len(), "Configuration source added");
        self.sources.push(Box::new(source));
        self
    }

    /// Optional TOML file
    pub fn add_toml_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.add(FigmentSource::toml_file(path))
    }

    /// Environment variables with `prefix`, `__` separating sections
    pub fn add_env(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.add(FigmentSource::env(prefix))
    }

    pub fn sources(&self) -> &[Box<dyn ConfigurationSource>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build a provider for every source and load them in order
    pub async fn build(&self) -> Result<Configuration, ConfigError> {
        let mut providers = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let provider = source.build();
            provider.load().await?;
            providers.push(provider);
        }

        info!(sources = providers.len(), "Configuration built");
        Ok(Configuration { providers })
    }
}

/// Layered, loaded configuration
pub struct Configuration {
    providers: Vec<Arc<dyn ConfigurationProvider>>,
}

impl Configuration {
    /// Value for `key` from the last provider that defines it.
    ///
    /// A provider that holds the key without a value still shadows earlier ones.
    pub fn get(&self, key: &str) -> Option<String> {
        self.providers
            .iter()
            .rev()
            .find_map(|provider| provider.try_get(key))
            .flatten()
    }

    /// Same precedence as [`get`](Self::get): a later null hides the key
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn providers(&self) -> &[Arc<dyn ConfigurationProvider>] {
        &self.providers
    }

    /// Explicit reload trigger: every provider reloads, in order
    pub async fn reload(&self) -> Result<(), ConfigError> {
        for provider in &self.providers {
            provider.load().await?;
        }
        info!(sources = self.providers.len(), "Configuration reloaded");
        Ok(())
    }

    /// Current snapshots merged through figment, later providers winning
    pub fn figment(&self) -> Figment {
        self.providers
            .iter()
            .fold(Figment::new(), |figment, provider| {
                figment.merge(provider.snapshot().as_ref().clone())
            })
    }

    /// Deserialize the whole configuration.
    ///
    /// Values are stored as strings, so numbers and booleans are parsed leniently.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(self.figment().extract_lossy()?)
    }

    /// Deserialize one section, e.g. `vault` or `database`
    pub fn extract_inner<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError> {
        Ok(self.figment().extract_inner_lossy(&section.to_lowercase())?)
    }
}
