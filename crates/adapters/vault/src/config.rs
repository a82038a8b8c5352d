//! Vault configuration

use serde::Deserialize;

/// Vault client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Vault server endpoint
    pub endpoint: String,

    /// Vault Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// Request timeout in seconds, 0 disables the client-side timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra PEM CA certificate files trusted for the server certificate
    #[serde(default)]
    pub ca_certs: Vec<String>,

    /// Verify the server TLS certificate
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_verify() -> bool {
    true
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8200".to_string(),
            namespace: None,
            request_timeout_secs: default_request_timeout(),
            ca_certs: Vec::new(),
            verify: default_verify(),
        }
    }
}

/// Builder for VaultConfig
pub struct VaultConfigBuilder {
    config: VaultConfig,
}

impl VaultConfigBuilder {
    /// Create a new builder with endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: VaultConfig {
                endpoint: endpoint.into(),
                ..Default::default()
            },
        }
    }

    /// Set namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.config.request_timeout_secs = timeout_secs;
        self
    }

    /// Trust an additional CA certificate file
    pub fn with_ca_cert(mut self, path: impl Into<String>) -> Self {
        self.config.ca_certs.push(path.into());
        self
    }

    /// Toggle server certificate verification
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.config.verify = verify;
        self
    }

    /// Build the configuration
    pub fn build(self) -> VaultConfig {
        self.config
    }
}
