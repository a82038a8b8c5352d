//! Secret payloads returned by the store

use std::collections::HashMap;

use serde_json::{Map, Value};
use vconf_errors::{AppError, AppResult};

/// Version metadata of a KV v2 secret
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretMetadata {
    /// KV engine mount the secret was read from
    pub mount_point: String,
    /// Path of the secret below the mount, as requested
    pub path: String,
    pub version: Option<u64>,
    pub created_time: Option<String>,
    pub custom_metadata: HashMap<String, String>,
}

impl SecretMetadata {
    pub fn new(mount_point: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            mount_point: mount_point.into(),
            path: path.into(),
            ..Default::default()
        }
    }
}

/// A secret's key/value data together with its metadata.
///
/// Values keep their JSON shape; callers decide how to render them. Keys keep
/// the order of the Vault response.
#[derive(Clone, PartialEq)]
pub struct VaultSecret {
    pub data: Map<String, Value>,
    pub metadata: SecretMetadata,
}

impl VaultSecret {
    pub fn new(metadata: SecretMetadata, data: Map<String, Value>) -> Self {
        Self { data, metadata }
    }

    /// Build from the `data` object of a KV v2 read.
    ///
    /// A deleted latest version comes back as `null` and yields no keys.
    pub fn from_kv2_data(metadata: SecretMetadata, data: Value) -> AppResult<Self> {
        match data {
            Value::Object(map) => Ok(Self::new(metadata, map)),
            Value::Null => Ok(Self::new(metadata, Map::new())),
            other => Err(AppError::internal(format!(
                "Secret at {}/{} is not a key/value object: {}",
                metadata.mount_point,
                metadata.path,
                value_type(&other)
            ))),
        }
    }
}

// values are secrets, only show the shape
impl std::fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecret")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("metadata", &self.metadata)
            .finish()
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_data() {
        let secret = VaultSecret::from_kv2_data(
            SecretMetadata::new("kv", "app"),
            json!({ "Secret1": "Value1", "Port": 5432 }),
        )
        .unwrap();
        assert_eq!(secret.data.len(), 2);
        assert_eq!(secret.data["Secret1"], json!("Value1"));
    }

    #[test]
    fn test_keys_keep_response_order() {
        let data = serde_json::from_str(r#"{ "zeta": "1", "alpha": "2", "Mid": "3" }"#).unwrap();
        let secret = VaultSecret::from_kv2_data(SecretMetadata::new("kv", "app"), data).unwrap();
        let keys: Vec<&str> = secret.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "Mid"]);
    }

    #[test]
    fn test_deleted_version_has_no_keys() {
        let secret = VaultSecret::from_kv2_data(SecretMetadata::new("kv", "app"), Value::Null).unwrap();
        assert!(secret.data.is_empty());
    }

    #[test]
    fn test_non_object_data_is_rejected() {
        let err = VaultSecret::from_kv2_data(SecretMetadata::new("kv", "app"), json!(["a"])).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_debug_hides_values() {
        let secret = VaultSecret::from_kv2_data(
            SecretMetadata::new("kv", "app"),
            json!({ "password": "hunter2" }),
        )
        .unwrap();
        let debug_output = format!("{:?}", secret);
        assert!(debug_output.contains("password"));
        assert!(!debug_output.contains("hunter2"));
    }
}
