//! Vault backed configuration provider

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, gauge};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use vconf_adapter_vault::{SecretStore, VaultSecret};

use crate::data::{ConfigData, SnapshotCell, value_to_string};
use crate::error::ConfigError;
use crate::source::ConfigurationProvider;
use crate::vault::policy::SecretKeyPolicy;

/// Result of reading one secret path during a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStatus {
    /// `included` keys were written, `skipped` were rejected by the key policy
    Loaded { included: usize, skipped: usize },
    /// `retryable` marks network/5xx failures a later reload may recover from
    Failed { error: String, retryable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLoadOutcome {
    pub path: String,
    pub status: PathStatus,
}

/// Per-path outcome of one load pass, in configured path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub mount_point: String,
    pub outcomes: Vec<PathLoadOutcome>,
}

impl LoadReport {
    /// Every path was read successfully
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| matches!(outcome.status, PathStatus::Loaded { .. }))
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, PathStatus::Failed { .. }))
            .map(|outcome| outcome.path.as_str())
    }
}

/// Populates configuration from Vault KV secrets.
///
/// Each load reads the configured paths one after another. A path that fails
/// is logged and skipped; the remaining paths still load. The published data
/// is swapped in only after every path has been attempted, so readers never
/// see a half-built snapshot. Concurrent loads on one instance are not
/// coordinated; callers serialize reloads.
pub struct VaultConfigurationProvider {
    client: Arc<dyn SecretStore>,
    policy: Arc<dyn SecretKeyPolicy>,
    secret_mount_point: String,
    secret_location_paths: Vec<String>,
    data: SnapshotCell,
    last_report: Mutex<Option<LoadReport>>,
}

impl VaultConfigurationProvider {
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
            data: SnapshotCell::new(),
            last_report: Mutex::new(None),
        }
    }

    pub fn secret_mount_point(&self) -> &str {
        &self.secret_mount_point
    }

    pub fn secret_location_paths(&self) -> &[String] {
        &self.secret_location_paths
    }

    /// Report of the most recent load, `None` before the first one
    pub fn last_report(&self) -> Option<LoadReport> {
        self.last_report.lock().clone()
    }

    /// Load every path and return what happened to each of them
    pub async fn load_with_report(&self) -> LoadReport {
        info!(
            mount_point = %self.secret_mount_point,
            paths = self.secret_location_paths.len(),
            "Loading configuration from Vault"
        );

        let mut data = ConfigData::new();
        let mut outcomes = Vec::with_capacity(self.secret_location_paths.len());

        for path in &self.secret_location_paths {
            let status = match self.client.read_secret(&self.secret_mount_point, path).await {
                Ok(secret) => {
                    counter!("vault_config_secret_reads_total", "outcome" => "success").increment(1);
                    self.add_secrets(&mut data, &secret)
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    counter!("vault_config_secret_reads_total", "outcome" => "failure").increment(1);
                    warn!(
                        mount_point = %self.secret_mount_point,
                        path = %path,
                        kind = err.kind(),
                        retryable,
                        error = %err,
                        "Failed to load secrets from Vault, skipping path"
                    );
                    PathStatus::Failed {
                        error: err.to_string(),
                        retryable,
                    }
                }
            };
            outcomes.push(PathLoadOutcome {
                path: path.clone(),
                status,
            });
        }

        gauge!("vault_config_loaded_keys", "mount_point" => self.secret_mount_point.clone())
            .set(data.len() as f64);
        info!(
            mount_point = %self.secret_mount_point,
            keys = data.len(),
            "Vault configuration loaded"
        );
        self.data.replace(data);

        let report = LoadReport {
            mount_point: self.secret_mount_point.clone(),
            outcomes,
        };
        *self.last_report.lock() = Some(report.clone());
        report
    }

    fn add_secrets(&self, data: &mut ConfigData, secret: &VaultSecret) -> PathStatus {
        let mut included = 0;
        let mut skipped = 0;

        for (raw_key, value) in &secret.data {
            if !self.policy.should_include(&secret.metadata, raw_key) {
                skipped += 1;
                continue;
            }

            let key = self.policy.map_key(&secret.metadata, raw_key);
            if data.insert(key.as_str(), value_to_string(value)).is_some() {
                debug!(key = %key, path = %secret.metadata.path, "Secret key overrides an earlier value");
            }
            included += 1;
        }

        PathStatus::Loaded { included, skipped }
    }
}

#[async_trait]
impl ConfigurationProvider for VaultConfigurationProvider {
    fn name(&self) -> &str {
        "vault"
    }

    /// Never fails: fetch errors are recorded in [`last_report`](Self::last_report)
    async fn load(&self) -> Result<(), ConfigError> {
        self.load_with_report().await;
        Ok(())
    }

    fn snapshot(&self) -> Arc<ConfigData> {
        self.data.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::policy::DefaultSecretKeyPolicy;
    use mockall::mock;
    use serde_json::{Value, json};
    use vconf_adapter_vault::SecretMetadata;
    use vconf_errors::{AppError, AppResult};

    mock! {
        pub Store {}

        #[async_trait]
        impl SecretStore for Store {
            async fn read_secret(&self, mount_point: &str, path: &str) -> AppResult<VaultSecret>;
        }
    }

    fn secret(path: &str, data: Value) -> VaultSecret {
        VaultSecret::from_kv2_data(SecretMetadata::new("kv", path), data).unwrap()
    }

    fn provider(store: MockStore, paths: &[&str]) -> VaultConfigurationProvider {
        VaultConfigurationProvider::new(
            Arc::new(store),
            Arc::new(DefaultSecretKeyPolicy),
            "kv",
            paths.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_loads_all_keys_from_vault() {
        let mut store = MockStore::new();
        store
            .expect_read_secret()
            .withf(|mount_point, path| mount_point == "kv" && path == "/secrets/app")
            .times(1)
            .returning(|_, path| Ok(secret(path, json!({ "Secret1": "Value1", "Secret2": "Value2" }))));

        let provider = provider(store, &["/secrets/app"]);
        provider.load().await.unwrap();

        assert_eq!(provider.try_get("Secret1"), Some(Some("Value1".to_string())));
        assert_eq!(provider.try_get("Secret2"), Some(Some("Value2".to_string())));
    }

    #[tokio::test]
    async fn test_supports_colon_in_secret_keys() {
        let mut store = MockStore::new();
        store.expect_read_secret().returning(|_, path| {
            Ok(secret(path, json!({ "Section:Secret1": "Value1", "Section:Secret2": "Value2" })))
        });

        let provider = provider(store, &["/secrets/app"]);
        provider.load().await.unwrap();

        assert_eq!(provider.try_get("Section:Secret1"), Some(Some("Value1".to_string())));
        assert_eq!(provider.try_get("section:secret2"), Some(Some("Value2".to_string())));
    }

    #[tokio::test]
    async fn test_failed_path_does_not_stop_other_paths() {
        let mut store = MockStore::new();
        store
            .expect_read_secret()
            .withf(|_, path| path == "broken")
            .returning(|_, _| Err(AppError::external_service("connection refused")));
        store
            .expect_read_secret()
            .withf(|_, path| path == "app")
            .returning(|_, path| Ok(secret(path, json!({ "ApiKey": "abc" }))));

        let provider = provider(store, &["broken", "app"]);
        let report = provider.load_with_report().await;

        assert_eq!(provider.try_get("apikey"), Some(Some("abc".to_string())));
        assert!(!report.is_complete());
        assert_eq!(report.failed_paths().collect::<Vec<_>>(), vec!["broken"]);
        assert!(matches!(
            report.outcomes[0].status,
            PathStatus::Failed { retryable: true, .. }
        ));
        assert_eq!(
            report.outcomes[1].status,
            PathStatus::Loaded { included: 1, skipped: 0 }
        );
        assert_eq!(provider.last_report(), Some(report));
    }

    #[tokio::test]
    async fn test_later_path_wins() {
        let mut store = MockStore::new();
        store
            .expect_read_secret()
            .withf(|_, path| path == "shared")
            .returning(|_, path| Ok(secret(path, json!({ "X": "shared", "Only": "shared" }))));
        store
            .expect_read_secret()
            .withf(|_, path| path == "app")
            .returning(|_, path| Ok(secret(path, json!({ "x": "app" }))));

        let provider = provider(store, &["shared", "app"]);
        provider.load().await.unwrap();

        assert_eq!(provider.try_get("X"), Some(Some("app".to_string())));
        assert_eq!(provider.try_get("Only"), Some(Some("shared".to_string())));
        assert_eq!(provider.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_later_key_in_same_secret_wins() {
        let mut store = MockStore::new();
        store.expect_read_secret().returning(|_, path| {
            let data = serde_json::from_str(r#"{ "x": "first", "X": "second" }"#).unwrap();
            Ok(secret(path, data))
        });

        let provider = provider(store, &["app"]);
        provider.load().await.unwrap();

        assert_eq!(provider.try_get("x"), Some(Some("second".to_string())));
        assert_eq!(provider.snapshot().keys(), vec!["X"]);
    }

    #[tokio::test]
    async fn test_null_value_is_absent() {
        let mut store = MockStore::new();
        store
            .expect_read_secret()
            .returning(|_, path| Ok(secret(path, json!({ "Empty": null, "Port": 5432 }))));

        let provider = provider(store, &["app"]);
        provider.load().await.unwrap();

        assert_eq!(provider.try_get("Empty"), Some(None));
        assert_eq!(provider.try_get("Port"), Some(Some("5432".to_string())));
    }

    struct SkipInternal;

    impl SecretKeyPolicy for SkipInternal {
        fn should_include(&self, _metadata: &SecretMetadata, key: &str) -> bool {
            !key.starts_with('_')
        }

        fn map_key(&self, metadata: &SecretMetadata, key: &str) -> String {
            format!("{}:{}", metadata.path.trim_start_matches('/'), key)
        }
    }

    #[tokio::test]
    async fn test_custom_policy_filters_and_renames() {
        let mut store = MockStore::new();
        store
            .expect_read_secret()
            .returning(|_, path| Ok(secret(path, json!({ "_rotation": "weekly", "Token": "t" }))));

        let provider = VaultConfigurationProvider::new(
            Arc::new(store),
            Arc::new(SkipInternal),
            "kv",
            vec!["/payments".to_string()],
        );
        let report = provider.load_with_report().await;

        assert_eq!(provider.try_get("payments:Token"), Some(Some("t".to_string())));
        assert_eq!(provider.try_get("_rotation"), None);
        assert_eq!(provider.try_get("payments:_rotation"), None);
        assert_eq!(
            report.outcomes[0].status,
            PathStatus::Loaded { included: 1, skipped: 1 }
        );
    }

    #[tokio::test]
    async fn test_no_paths_loads_nothing() {
        let store = MockStore::new();
        let provider = provider(store, &[]);

        let report = provider.load_with_report().await;
        assert!(report.is_complete());
        assert!(provider.snapshot().is_empty());
    }

    #[test]
    fn test_unloaded_provider_is_empty() {
        let provider = provider(MockStore::new(), &["app"]);
        assert!(provider.snapshot().is_empty());
        assert!(provider.last_report().is_none());
        assert_eq!(provider.secret_mount_point(), "kv");
        assert_eq!(provider.secret_location_paths(), ["app".to_string()]);
    }
}
