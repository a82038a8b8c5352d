//! vconf-adapter-vault - HashiCorp Vault adapter
//!
//! Provides a read-only secret store over Vault with support for:
//! - AppRole authentication
//! - TLS client-certificate authentication
//! - KV v2 secrets engine (data plus version metadata)
//! - Automatic error mapping to AppError

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod secret;

pub use auth::{AppRoleAuth, CertificateAuth, ClientIdentity, VaultAuthMethod};
pub use client::{SecretStore, VaultClient};
pub use config::{VaultConfig, VaultConfigBuilder};
pub use secret::{SecretMetadata, VaultSecret};
