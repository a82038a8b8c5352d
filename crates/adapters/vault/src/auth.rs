//! Authentication methods supported by the Vault client

use std::fmt;
use std::path::Path;

use secrecy::{ExposeSecret, Secret};
use vconf_errors::{AppError, AppResult};

/// Default mount of the AppRole auth engine
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";

/// Default mount of the TLS certificate auth engine
pub const DEFAULT_CERT_MOUNT: &str = "cert";

/// How the client proves its identity to Vault.
///
/// Exactly one method is chosen per client.
#[derive(Debug)]
pub enum VaultAuthMethod {
    AppRole(AppRoleAuth),
    Certificate(CertificateAuth),
}

impl VaultAuthMethod {
    /// AppRole credentials on the default `approle` mount
    pub fn app_role(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self::AppRole(AppRoleAuth {
            role_id: role_id.into(),
            secret_id: Secret::new(secret_id.into()),
            mount: DEFAULT_APPROLE_MOUNT.to_string(),
        })
    }

    /// Client certificate on the default `cert` mount
    pub fn certificate(identity: ClientIdentity) -> Self {
        Self::Certificate(CertificateAuth {
            identity,
            mount: DEFAULT_CERT_MOUNT.to_string(),
            role: None,
        })
    }

    /// Override the auth engine mount
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        match &mut self {
            Self::AppRole(auth) => auth.mount = mount.into(),
            Self::Certificate(auth) => auth.mount = mount.into(),
        }
        self
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppRole(_) => "approle",
            Self::Certificate(_) => "cert",
        }
    }
}

/// AppRole role_id / secret_id pair
#[derive(Debug, Clone)]
pub struct AppRoleAuth {
    pub role_id: String,
    pub secret_id: Secret<String>,
    pub mount: String,
}

/// TLS client certificate login
#[derive(Debug)]
pub struct CertificateAuth {
    pub identity: ClientIdentity,
    pub mount: String,
    /// Certificate role name; Vault tries every matching role when unset
    pub role: Option<String>,
}

impl CertificateAuth {
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Client certificate and private key presented during the TLS handshake
pub struct ClientIdentity(reqwest::Identity);

impl ClientIdentity {
    /// Load a password protected PKCS#12 (`.pfx` / `.p12`) bundle
    pub fn from_pkcs12_file(path: impl AsRef<Path>, password: &Secret<String>) -> AppResult<Self> {
        let path = path.as_ref();
        let der = std::fs::read(path).map_err(|e| {
            AppError::certificate(format!(
                "Failed to read client certificate {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_pkcs12_der(&der, password).map_err(|e| {
            AppError::certificate(format!(
                "Invalid client certificate {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse a PKCS#12 bundle that is already in memory
    pub fn from_pkcs12_der(der: &[u8], password: &Secret<String>) -> AppResult<Self> {
        reqwest::Identity::from_pkcs12_der(der, password.expose_secret())
            .map(Self)
            .map_err(|e| AppError::certificate(e.to_string()))
    }

    pub(crate) fn into_inner(self) -> reqwest::Identity {
        self.0
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientIdentity([REDACTED])")
    }
}
