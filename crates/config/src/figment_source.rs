//! File and environment layers backed by figment providers

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde_json::Value;
use tracing::debug;

use crate::data::{ConfigData, KEY_DELIMITER, SnapshotCell, value_to_string};
use crate::error::ConfigError;
use crate::source::{ConfigurationProvider, ConfigurationSource};

type FigmentFactory = Arc<dyn Fn() -> Figment + Send + Sync>;

/// Adapts figment providers (TOML files, environment variables, ...) into a
/// configuration source.
///
/// The figment is rebuilt on every load so files and the environment are
/// re-read on reload. Missing TOML files contribute nothing.
#[derive(Clone)]
pub struct FigmentSource {
    name: String,
    factory: FigmentFactory,
}

impl FigmentSource {
    /// Wrap an already assembled figment
    pub fn new(name: impl Into<String>, figment: Figment) -> Self {
        Self::from_fn(name, move || figment.clone())
    }

    /// Build the figment lazily on each load
    pub fn from_fn<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Figment + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// A TOML file; absent files are skipped
    pub fn toml_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::from_fn(format!("toml:{}", path.display()), move || {
            Figment::from(Toml::file(&path))
        })
    }

    /// Environment variables with `prefix`; `__` separates sections
    pub fn env(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::from_fn(format!("env:{}", prefix), move || {
            Figment::from(Env::prefixed(&prefix).split("__"))
        })
    }
}

impl std::fmt::Debug for FigmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FigmentSource").field("name", &self.name).finish()
    }
}

impl ConfigurationSource for FigmentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self) -> Arc<dyn ConfigurationProvider> {
        Arc::new(FigmentProvider {
            name: self.name.clone(),
            factory: self.factory.clone(),
            data: SnapshotCell::new(),
        })
    }
}

/// Provider produced by [`FigmentSource`]
pub struct FigmentProvider {
    name: String,
    factory: FigmentFactory,
    data: SnapshotCell,
}

#[async_trait]
impl ConfigurationProvider for FigmentProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<(), ConfigError> {
        let value: Value = (self.factory)().extract()?;

        let mut data = ConfigData::new();
        flatten(None, &value, &mut data);
        debug!(source = %self.name, keys = data.len(), "Loaded configuration layer");

        self.data.replace(data);
        Ok(())
    }

    fn snapshot(&self) -> Arc<ConfigData> {
        self.data.load()
    }
}

fn flatten(prefix: Option<&str>, value: &Value, data: &mut ConfigData) {
    let child_key = |segment: &str| match prefix {
        Some(prefix) => format!("{}{}{}", prefix, KEY_DELIMITER, segment),
        None => segment.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(Some(&child_key(key)), child, data);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(Some(&child_key(&index.to_string())), child, data);
            }
        }
        scalar => {
            if let Some(key) = prefix {
                data.insert(key, value_to_string(scalar));
            }
        }
    }
}
