//! vconf-config - 分层配置加载库
//!
//! Sources are registered on a [`ConfigurationBuilder`] and loaded in order;
//! later sources override earlier ones. Keys are `:` delimited and matched
//! case-insensitively. Files and environment variables are read through
//! figment, Vault KV secrets through [`vault::VaultConfigurationProvider`].
//!
//! ```no_run
//! use vconf_config::{ConfigurationBuilder, VaultConfigurationExt};
//!
//! # async fn run() -> Result<(), vconf_config::ConfigError> {
//! let mut builder = ConfigurationBuilder::new();
//! builder
//!     .add_toml_file("config/default.toml")
//!     .add_vault_with_app_role(
//!         "http://127.0.0.1:8200",
//!         "role-id",
//!         "secret-id",
//!         "secret",
//!         ["shared", "myapp"],
//!     )?;
//!
//! let config = builder.build().await?;
//! let password = config.get("Database:Password");
//! # Ok(())
//! # }
//! ```

mod builder;
mod data;
mod error;
mod figment_source;
mod source;
pub mod vault;

pub use builder::{Configuration, ConfigurationBuilder};
pub use data::{ConfigData, KEY_DELIMITER};
pub use error::ConfigError;
pub use figment_source::{FigmentProvider, FigmentSource};
pub use source::{ConfigurationProvider, ConfigurationSource};
pub use vault::{
    DefaultSecretKeyPolicy, SecretKeyPolicy, VaultConfigurationExt, VaultConfigurationOptions,
    VaultConfigurationSource,
};
