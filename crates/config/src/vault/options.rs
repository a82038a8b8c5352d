//! Vault 连接配置
//!
//! Usually bound from the `vault` section of the file/env configuration.

use secrecy::Secret;
use serde::{Deserialize, Deserializer};
use vconf_adapter_vault::VaultConfig;

use crate::builder::Configuration;
use crate::error::ConfigError;

/// Connection options for the Vault configuration source.
///
/// Certificate authentication is used when `certificate_path` is set,
/// AppRole otherwise. Keys are matched case-insensitively, so both
/// `secret_mount_point` and `SecretMountPoint` bind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultConfigurationOptions {
    pub enabled: bool,

    pub url: String,

    #[serde(alias = "roleid")]
    pub role_id: Option<String>,

    #[serde(alias = "secretid")]
    pub secret_id: Option<Secret<String>>,

    #[serde(alias = "certificatepath")]
    pub certificate_path: Option<String>,

    #[serde(alias = "certificatepassword")]
    pub certificate_password: Option<Secret<String>>,

    /// KV v2 engine mount holding the secrets
    #[serde(alias = "secretmountpoint")]
    pub secret_mount_point: String,

    /// Secret paths, later paths override earlier ones
    #[serde(
        alias = "secretlocationpaths",
        alias = "secret_path",
        alias = "secretpath",
        deserialize_with = "one_or_many"
    )]
    pub secret_location_paths: Vec<String>,

    /// AppRole auth engine mount, `approle` when unset
    #[serde(alias = "approlemount")]
    pub approle_mount: Option<String>,

    /// Cert auth engine mount, `cert` when unset
    #[serde(alias = "certificatemount")]
    pub certificate_mount: Option<String>,

    /// Cert auth role name
    #[serde(alias = "certificaterole")]
    pub certificate_role: Option<String>,

    pub namespace: Option<String>,

    #[serde(alias = "requesttimeoutsecs")]
    pub request_timeout_secs: Option<u64>,
}

/// Credentials selected from the options
#[derive(Debug, Clone)]
pub enum VaultCredentials {
    AppRole {
        role_id: String,
        secret_id: Secret<String>,
    },
    Certificate {
        path: String,
        password: Secret<String>,
    },
}

impl VaultConfigurationOptions {
    /// Bind `section` of an already built configuration.
    ///
    /// Returns `None` when the section does not exist.
    pub fn from_configuration(
        configuration: &Configuration,
        section: &str,
    ) -> Result<Option<Self>, ConfigError> {
        if !configuration.figment().contains(&section.to_lowercase()) {
            return Ok(None);
        }
        configuration.extract_inner(section).map(Some)
    }

    /// A non-blank certificate path selects certificate mode, anything else AppRole.
    ///
    /// Blank fields are left for registration to reject.
    pub fn credentials(&self) -> VaultCredentials {
        match &self.certificate_path {
            Some(path) if !path.trim().is_empty() => VaultCredentials::Certificate {
                path: path.clone(),
                password: self
                    .certificate_password
                    .clone()
                    .unwrap_or_else(|| Secret::new(String::new())),
            },
            _ => VaultCredentials::AppRole {
                role_id: self.role_id.clone().unwrap_or_default(),
                secret_id: self
                    .secret_id
                    .clone()
                    .unwrap_or_else(|| Secret::new(String::new())),
            },
        }
    }

    /// Client settings derived from the options
    pub fn client_config(&self) -> VaultConfig {
        let defaults = VaultConfig::default();
        VaultConfig {
            endpoint: self.url.trim().to_string(),
            namespace: self.namespace.clone().filter(|ns| !ns.trim().is_empty()),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            ..defaults
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) if path.trim().is_empty() => Vec::new(),
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn options() -> VaultConfigurationOptions {
        VaultConfigurationOptions {
            enabled: true,
            url: "http://127.0.0.1:8200".to_string(),
            secret_mount_point: "kv".to_string(),
            secret_location_paths: vec!["app".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_certificate_path_selects_certificate_mode() {
        let options = VaultConfigurationOptions {
            certificate_path: Some("/etc/vault/client.pfx".to_string()),
            certificate_password: Some(Secret::new("changeit".to_string())),
            role_id: Some("role".to_string()),
            secret_id: Some(Secret::new("secret".to_string())),
            ..options()
        };

        match options.credentials() {
            VaultCredentials::Certificate { path, password } => {
                assert_eq!(path, "/etc/vault/client.pfx");
                assert_eq!(password.expose_secret(), "changeit");
            }
            other => panic!("expected certificate mode, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_certificate_path_selects_app_role() {
        let options = VaultConfigurationOptions {
            role_id: Some("role".to_string()),
            secret_id: Some(Secret::new("secret".to_string())),
            certificate_path: Some("   ".to_string()),
            ..options()
        };

        match options.credentials() {
            VaultCredentials::AppRole { role_id, secret_id } => {
                assert_eq!(role_id, "role");
                assert_eq!(secret_id.expose_secret(), "secret");
            }
            other => panic!("expected AppRole mode, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let options = VaultConfigurationOptions {
            secret_id: Some(Secret::new("my-secret-id".to_string())),
            certificate_password: Some(Secret::new("my-cert-password".to_string())),
            ..options()
        };

        let debug_output = format!("{:?}", options);
        assert!(!debug_output.contains("my-secret-id"));
        assert!(!debug_output.contains("my-cert-password"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_client_config_applies_defaults() {
        let config = options().client_config();
        assert_eq!(config.endpoint, "http://127.0.0.1:8200");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_deserialize_single_secret_path() {
        let options: VaultConfigurationOptions = serde_json::from_str(
            r#"{ "enabled": true, "url": "http://vault:8200", "secret_path": "myapp" }"#,
        )
        .unwrap();
        assert_eq!(options.secret_location_paths, vec!["myapp".to_string()]);
        assert!(options.enabled);
    }

    #[test]
    fn test_deserialize_path_list() {
        let options: VaultConfigurationOptions = serde_json::from_str(
            r#"{ "secret_location_paths": ["shared", "myapp"], "secret_mount_point": "kv" }"#,
        )
        .unwrap();
        assert_eq!(options.secret_location_paths, vec!["shared", "myapp"]);
        assert!(!options.enabled);
    }
}
