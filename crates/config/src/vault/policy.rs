//! Which secret keys become configuration keys, and under what name

use vconf_adapter_vault::SecretMetadata;

use crate::data::KEY_DELIMITER;

/// Decides per raw secret key whether to load it and how to name it.
pub trait SecretKeyPolicy: Send + Sync {
    /// `false` skips the key entirely
    fn should_include(&self, metadata: &SecretMetadata, key: &str) -> bool;

    /// Configuration key the secret value is stored under
    fn map_key(&self, metadata: &SecretMetadata, key: &str) -> String;
}

/// Loads every key under its own name.
///
/// Keys that already contain `:` land in nested sections unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSecretKeyPolicy;

impl SecretKeyPolicy for DefaultSecretKeyPolicy {
    fn should_include(&self, _metadata: &SecretMetadata, _key: &str) -> bool {
        true
    }

    fn map_key(&self, _metadata: &SecretMetadata, key: &str) -> String {
        key.to_string()
    }
}

/// Places keys under a fixed section and skips keys with a reserved prefix.
#[derive(Debug, Clone)]
pub struct PrefixedSecretKeyPolicy {
    section: String,
    reserved_prefix: Option<String>,
}

impl PrefixedSecretKeyPolicy {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            reserved_prefix: None,
        }
    }

    /// Skip keys starting with `prefix` (case-insensitive)
    pub fn ignoring(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = Some(prefix.into().to_lowercase());
        self
    }
}

impl SecretKeyPolicy for PrefixedSecretKeyPolicy {
    fn should_include(&self, _metadata: &SecretMetadata, key: &str) -> bool {
        match &self.reserved_prefix {
            Some(prefix) => !key.to_lowercase().starts_with(prefix),
            None => true,
        }
    }

    fn map_key(&self, _metadata: &SecretMetadata, key: &str) -> String {
        if self.section.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", self.section, KEY_DELIMITER, key)
        }
    }
}
