use std::fmt;
use std::sync::Arc;

use vconf_adapter_vault::SecretStore;

use crate::source::{ConfigurationProvider, ConfigurationSource};
use crate::vault::policy::SecretKeyPolicy;
use crate::vault::provider::VaultConfigurationProvider;

/// Vault secrets as a configuration source.
///
/// Holds the authenticated client, the KV mount, the ordered secret paths and
/// the key policy. Building it performs no I/O.
#[derive(Clone)]
pub struct VaultConfigurationSource {
    client: Arc<dyn SecretStore>,
    policy: Arc<dyn SecretKeyPolicy>,
    secret_mount_point: String,
    secret_location_paths: Vec<String>,
}

impl VaultConfigurationSource {
    pub fn new(
        client: Arc<dyn SecretStore>,
        policy: Arc<dyn SecretKeyPolicy>,
        secret_mount_point: impl Into<String>,
        secret_location_paths: Vec<String>,
    ) -> Self {
        Self {
            client,
            policy,
            secret_mount_point: secret_mount_point.into(),
            secret_location_paths,
        }
    }

    pub fn secret_mount_point(&self) -> &str {
        &self.secret_mount_point
    }

    pub fn secret_location_paths(&self) -> &[String] {
        &self.secret_location_paths
    }

    /// Concrete provider, for callers that want [`VaultConfigurationProvider::load_with_report`]
    pub fn build_provider(&self) -> VaultConfigurationProvider {
        VaultConfigurationProvider::new(
            self.client.clone(),
            self.policy.clone(),
            self.secret_mount_point.clone(),
            self.secret_location_paths.clone(),
        )
    }
}

impl fmt::Debug for VaultConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfigurationSource")
            .field("secret_mount_point", &self.secret_mount_point)
            .field("secret_location_paths", &self.secret_location_paths)
            .finish_non_exhaustive()
    }
}

impl ConfigurationSource for VaultConfigurationSource {
    fn name(&self) -> &str {
        "vault"
    }

    fn build(&self) -> Arc<dyn ConfigurationProvider> {
        Arc::new(self.build_provider())
    }
}
