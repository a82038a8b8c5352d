//! Vault client implementation

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;
use vaultrs::api;
use vaultrs::api::kv2::requests::ReadSecretRequest;
use vaultrs::client::{Client, VaultClient as VaultRsClient, VaultClientSettingsBuilder};
use vaultrs_login::LoginClient;
use vaultrs_login::engines::approle::AppRoleLogin;
use vconf_errors::{AppError, AppResult};

use crate::auth::{AppRoleAuth, VaultAuthMethod};
use crate::config::VaultConfig;
use crate::error::map_vault_error;
use crate::secret::{SecretMetadata, VaultSecret};

/// Read-only access to key/value secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the latest version of the secret at `path` below `mount_point`
    async fn read_secret(&self, mount_point: &str, path: &str) -> AppResult<VaultSecret>;
}

/// Login performed on first use; the TLS identity already lives in the transport
#[derive(Debug)]
enum Login {
    AppRole(AppRoleAuth),
    Certificate { mount: String, role: Option<String> },
}

/// Vault client for secret management.
///
/// Construction does no network I/O. The login handshake runs on the first
/// read and its token is reused afterwards; a failed login is retried on the
/// next read. A read rejected with 401/403 logs in again and is retried once,
/// so an expired token does not outlive the next reload.
pub struct VaultClient {
    client: RwLock<VaultRsClient>,
    login: Login,
    // serializes logins; the flag is only written while it is held
    login_lock: Mutex<()>,
    authenticated: AtomicBool,
    endpoint: String,
}

impl VaultClient {
    /// Create a new Vault client for the given auth method
    pub fn new(config: VaultConfig, auth: VaultAuthMethod) -> AppResult<Self> {
        debug!(endpoint = %config.endpoint, auth = auth.kind(), "Creating Vault client");

        Url::parse(&config.endpoint).map_err(|e| {
            AppError::validation(format!("Invalid Vault endpoint {}: {}", config.endpoint, e))
        })?;

        let mut settings = VaultClientSettingsBuilder::default();
        settings
            .address(&config.endpoint)
            .namespace(config.namespace.clone())
            .ca_certs(config.ca_certs.clone())
            .verify(config.verify);
        if config.request_timeout_secs > 0 {
            settings.timeout(Some(Duration::from_secs(config.request_timeout_secs)));
        }

        let login = match auth {
            VaultAuthMethod::AppRole(app_role) => Login::AppRole(app_role),
            VaultAuthMethod::Certificate(cert) => {
                settings.identity(Some(cert.identity.into_inner()));
                Login::Certificate {
                    mount: cert.mount,
                    role: cert.role,
                }
            }
        };

        let settings = settings
            .build()
            .map_err(|e| AppError::validation(format!("Invalid Vault client settings: {}", e)))?;

        let client = VaultRsClient::new(settings)
            .map_err(|e| map_vault_error(e, "Failed to create Vault client"))?;

        Ok(Self {
            client: RwLock::new(client),
            login,
            login_lock: Mutex::new(()),
            authenticated: AtomicBool::new(false),
            endpoint: config.endpoint,
        })
    }

    /// Server address this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a login has already succeeded
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn ensure_authenticated(&self) -> AppResult<()> {
        if self.is_authenticated() {
            return Ok(());
        }

        let _guard = self.login_lock.lock().await;
        if self.is_authenticated() {
            return Ok(());
        }
        self.authenticate().await?;
        self.authenticated.store(true, Ordering::Release);
        Ok(())
    }

    /// Drop the current token and log in again
    async fn reauthenticate(&self) -> AppResult<()> {
        let _guard = self.login_lock.lock().await;
        self.authenticated.store(false, Ordering::Release);
        self.authenticate().await?;
        self.authenticated.store(true, Ordering::Release);
        Ok(())
    }

    async fn authenticate(&self) -> AppResult<()> {
        let mut client = self.client.write().await;

        match &self.login {
            Login::AppRole(auth) => {
                info!(endpoint = %self.endpoint, mount = %auth.mount, "Authenticating with AppRole");
                let login = AppRoleLogin::new(&auth.role_id, auth.secret_id.expose_secret());
                client
                    .login(&auth.mount, &login)
                    .await
                    .map_err(|e| map_vault_error(e, "AppRole authentication failed"))?;
            }
            Login::Certificate { mount, role } => {
                info!(endpoint = %self.endpoint, mount = %mount, "Authenticating with client certificate");
                let auth_info = vaultrs::auth::cert::login(&*client, mount, role.as_deref().unwrap_or_default())
                    .await
                    .map_err(|e| map_vault_error(e, "Certificate authentication failed"))?;
                client.set_token(&auth_info.client_token);
            }
        }

        info!(endpoint = %self.endpoint, "Successfully authenticated with Vault");
        Ok(())
    }

    /// Get a secret from Vault
    pub async fn get_secret(&self, mount_point: &str, path: &str) -> AppResult<VaultSecret> {
        self.ensure_authenticated().await?;

        retry_after_relogin(
            || self.read_kv2(mount_point, path),
            || self.reauthenticate(),
        )
        .await
    }

    async fn read_kv2(&self, mount_point: &str, path: &str) -> AppResult<VaultSecret> {
        // KV v2 joins `{mount}/data/{path}` itself
        let relative_path = path.trim_start_matches('/');
        debug!(mount_point, path = relative_path, "Reading secret");

        let endpoint = ReadSecretRequest::builder()
            .mount(mount_point)
            .path(relative_path)
            .build()
            .map_err(|e| AppError::validation(format!("Invalid secret request: {}", e)))?;

        let client = self.client.read().await;
        let response = api::exec_with_result(&*client, endpoint)
            .await
            .map_err(|e| {
                map_vault_error(
                    e,
                    &format!("Failed to read secret at path: {}/{}", mount_point, relative_path),
                )
            })?;

        let metadata = SecretMetadata {
            mount_point: mount_point.to_string(),
            path: path.to_string(),
            version: Some(response.metadata.version),
            created_time: Some(response.metadata.created_time),
            custom_metadata: response.metadata.custom_metadata.unwrap_or_default(),
        };
        let secret = VaultSecret::from_kv2_data(metadata, response.data)?;

        debug!(
            mount_point,
            path = relative_path,
            version = ?secret.metadata.version,
            keys = secret.data.len(),
            "Successfully read secret"
        );
        Ok(secret)
    }
}

/// Run `read`; when the token is rejected, log in again and run it once more.
///
/// A 403 caused by policy rather than an expired token fails the second
/// attempt the same way and is returned as is.
async fn retry_after_relogin<T, R, RF, L, LF>(read: R, relogin: L) -> AppResult<T>
where
    R: Fn() -> RF,
    RF: Future<Output = AppResult<T>>,
    L: FnOnce() -> LF,
    LF: Future<Output = AppResult<()>>,
{
    match read().await {
        Err(err) if err.is_auth_failure() => {
            warn!(error = %err, "Vault rejected the token, logging in again");
            relogin().await?;
            read().await
        }
        other => other,
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read_secret(&self, mount_point: &str, path: &str) -> AppResult<VaultSecret> {
        self.get_secret(mount_point, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfigBuilder;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_expired_token_logs_in_again_and_retries() {
        let reads = &AtomicUsize::new(0);
        let logins = &AtomicUsize::new(0);

        let result = retry_after_relogin(
            || async move {
                match reads.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(AppError::forbidden("permission denied")),
                    _ => Ok("value"),
                }
            },
            || async move {
                logins.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), "value");
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_after_relogin_is_returned() {
        let reads = &AtomicUsize::new(0);

        let result: AppResult<()> = retry_after_relogin(
            || async move {
                reads.fetch_add(1, Ordering::SeqCst);
                Err(AppError::unauthenticated("missing client token"))
            },
            || async { Ok(()) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_relogin_is_returned() {
        let result: AppResult<()> = retry_after_relogin(
            || async { Err(AppError::forbidden("permission denied")) },
            || async { Err(AppError::external_service("connection refused")) },
        )
        .await;

        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_other_errors_do_not_log_in_again() {
        let logins = &AtomicUsize::new(0);

        let result: AppResult<()> = retry_after_relogin(
            || async { Err(AppError::not_found("secret/app")) },
            || async move {
                logins.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(logins.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_new_does_not_authenticate() {
        let config = VaultConfigBuilder::new("http://127.0.0.1:8200").build();
        let client = VaultClient::new(config, VaultAuthMethod::app_role("role", "secret")).unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(client.endpoint(), "http://127.0.0.1:8200");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = VaultConfigBuilder::new("not a url").build();
        let result = VaultClient::new(config, VaultAuthMethod::app_role("role", "secret"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_read() {
        // port 9 (discard) is never a Vault server
        let config = VaultConfigBuilder::new("http://127.0.0.1:9")
            .with_request_timeout(2)
            .build();
        let client = VaultClient::new(config, VaultAuthMethod::app_role("role", "secret")).unwrap();

        let result = client.read_secret("secret", "app").await;
        assert!(result.is_err());
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    #[ignore] // Requires running Vault server
    async fn test_read_secret_with_approle() {
        let config = VaultConfigBuilder::new(
            std::env::var("VAULT_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8200".to_string()),
        )
        .build();
        let auth = VaultAuthMethod::app_role(
            std::env::var("VAULT_ROLE_ID").unwrap(),
            std::env::var("VAULT_SECRET_ID").unwrap(),
        );

        let client = VaultClient::new(config, auth).unwrap();
        let secret = client.read_secret("secret", "test/credentials").await;
        assert!(secret.is_ok());
        assert!(client.is_authenticated());
    }
}
