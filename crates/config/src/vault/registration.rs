//! Registering Vault sources on a [`ConfigurationBuilder`]
//!
//! Every argument is validated before a client is created, so a
//! misconfiguration fails here instead of during the first load. None of
//! these calls talk to Vault.

use std::path::Path;
use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use tracing::{debug, info};
use url::Url;
use vconf_adapter_vault::{
    ClientIdentity, SecretStore, VaultAuthMethod, VaultClient, VaultConfig,
};

use crate::builder::ConfigurationBuilder;
use crate::error::ConfigError;
use crate::vault::options::{VaultConfigurationOptions, VaultCredentials};
use crate::vault::policy::{DefaultSecretKeyPolicy, SecretKeyPolicy};
use crate::vault::source::VaultConfigurationSource;

/// Vault registration calls for [`ConfigurationBuilder`]
pub trait VaultConfigurationExt {
    /// AppRole login with `role_id` / `secret_id`
    fn add_vault_with_app_role<I, S>(
        &mut self,
        url: &str,
        role_id: &str,
        secret_id: &str,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    /// TLS client certificate login with a PKCS#12 bundle
    fn add_vault_with_certificate<I, S>(
        &mut self,
        url: &str,
        certificate_path: impl AsRef<Path>,
        certificate_password: &str,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    /// Any supported auth method with the default key policy
    fn add_vault_with_auth_method<I, S>(
        &mut self,
        url: &str,
        auth_method: VaultAuthMethod,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;

    /// Register from options; a no-op when absent or disabled
    fn add_vault_from_options(
        &mut self,
        options: Option<&VaultConfigurationOptions>,
    ) -> Result<&mut Self, ConfigError>;

    /// Register from options with a custom key policy
    fn add_vault_from_options_with_policy(
        &mut self,
        options: Option<&VaultConfigurationOptions>,
        policy: Arc<dyn SecretKeyPolicy>,
    ) -> Result<&mut Self, ConfigError>;

    /// Base registration with a ready client and policy
    fn add_vault<I, S>(
        &mut self,
        client: Arc<dyn SecretStore>,
        policy: Arc<dyn SecretKeyPolicy>,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
}

impl VaultConfigurationExt for ConfigurationBuilder {
    fn add_vault_with_app_role<I, S>(
        &mut self,
        url: &str,
        role_id: &str,
        secret_id: &str,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require("url", url)?;
        let auth = app_role_auth(role_id, secret_id)?;
        self.add_vault_with_auth_method(url, auth, secret_mount_point, secret_location_paths)
    }

    fn add_vault_with_certificate<I, S>(
        &mut self,
        url: &str,
        certificate_path: impl AsRef<Path>,
        certificate_password: &str,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let certificate_path = certificate_path.as_ref();
        require("url", url)?;
        require("certificate_path", &certificate_path.to_string_lossy())?;
        require("certificate_password", certificate_password)?;
        require("secret_mount_point", secret_mount_point)?;
        parse_url(url)?;

        let password = Secret::new(certificate_password.to_string());
        let auth = certificate_auth(certificate_path, &password, None, None)?;
        self.add_vault_with_auth_method(url, auth, secret_mount_point, secret_location_paths)
    }

    fn add_vault_with_auth_method<I, S>(
        &mut self,
        url: &str,
        auth_method: VaultAuthMethod,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = VaultConfig {
            endpoint: url.trim().to_string(),
            ..VaultConfig::default()
        };
        register_client(
            self,
            config,
            auth_method,
            Arc::new(DefaultSecretKeyPolicy),
            secret_mount_point,
            secret_location_paths,
        )
    }

    fn add_vault_from_options(
        &mut self,
        options: Option<&VaultConfigurationOptions>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_vault_from_options_with_policy(options, Arc::new(DefaultSecretKeyPolicy))
    }

    fn add_vault_from_options_with_policy(
        &mut self,
        options: Option<&VaultConfigurationOptions>,
        policy: Arc<dyn SecretKeyPolicy>,
    ) -> Result<&mut Self, ConfigError> {
        let Some(options) = options.filter(|options| options.enabled) else {
            debug!("Vault configuration disabled, no source added");
            return Ok(self);
        };

        require("url", &options.url)?;
        let auth = match options.credentials() {
            VaultCredentials::Certificate { path, password } => {
                require("certificate_password", password.expose_secret())?;
                require("secret_mount_point", &options.secret_mount_point)?;
                parse_url(&options.url)?;
                certificate_auth(
                    Path::new(&path),
                    &password,
                    options.certificate_mount.as_deref(),
                    options.certificate_role.as_deref(),
                )?
            }
            VaultCredentials::AppRole { role_id, secret_id } => {
                let auth = app_role_auth(&role_id, secret_id.expose_secret())?;
                match options.approle_mount.as_deref().filter(|m| !m.trim().is_empty()) {
                    Some(mount) => auth.with_mount(mount),
                    None => auth,
                }
            }
        };

        register_client(
            self,
            options.client_config(),
            auth,
            policy,
            &options.secret_mount_point,
            options.secret_location_paths.iter().cloned(),
        )
    }

    fn add_vault<I, S>(
        &mut self,
        client: Arc<dyn SecretStore>,
        policy: Arc<dyn SecretKeyPolicy>,
        secret_mount_point: &str,
        secret_location_paths: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if secret_mount_point.trim().is_empty() {
            return Err(ConfigError::MissingArgument("secret_mount_point"));
        }

        let paths: Vec<String> = secret_location_paths.into_iter().map(Into::into).collect();
        info!(
            mount_point = %secret_mount_point,
            paths = ?paths,
            "Vault configuration source registered"
        );
        Ok(self.add(VaultConfigurationSource::new(
            client,
            policy,
            secret_mount_point,
            paths,
        )))
    }
}

fn register_client<'a, I, S>(
    builder: &'a mut ConfigurationBuilder,
    config: VaultConfig,
    auth_method: VaultAuthMethod,
    policy: Arc<dyn SecretKeyPolicy>,
    secret_mount_point: &str,
    secret_location_paths: I,
) -> Result<&'a mut ConfigurationBuilder, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    require("url", &config.endpoint)?;
    require("secret_mount_point", secret_mount_point)?;
    parse_url(&config.endpoint)?;

    let client = VaultClient::new(config, auth_method).map_err(ConfigError::Client)?;
    builder.add_vault(Arc::new(client), policy, secret_mount_point, secret_location_paths)
}

fn app_role_auth(role_id: &str, secret_id: &str) -> Result<VaultAuthMethod, ConfigError> {
    require("role_id", role_id)?;
    require("secret_id", secret_id)?;
    Ok(VaultAuthMethod::app_role(role_id, secret_id))
}

fn certificate_auth(
    path: &Path,
    password: &Secret<String>,
    mount: Option<&str>,
    role: Option<&str>,
) -> Result<VaultAuthMethod, ConfigError> {
    let identity = ClientIdentity::from_pkcs12_file(path, password).map_err(ConfigError::Certificate)?;
    debug!(path = %path.display(), "Client certificate loaded");

    let mut auth = VaultAuthMethod::certificate(identity);
    if let Some(mount) = mount.filter(|m| !m.trim().is_empty()) {
        auth = auth.with_mount(mount);
    }
    if let (VaultAuthMethod::Certificate(cert), Some(role)) = (&mut auth, role) {
        cert.role = Some(role.to_string());
    }
    Ok(auth)
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::blank(name));
    }
    Ok(())
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidUri {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ConfigError::InvalidUri {
            url: url.to_string(),
            reason: format!("unsupported scheme `{}`", scheme),
        }),
    }
}
