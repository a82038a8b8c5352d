//! Vault KV secrets as a configuration source

mod options;
mod policy;
mod provider;
mod registration;
mod source;

pub use options::{VaultConfigurationOptions, VaultCredentials};
pub use policy::{DefaultSecretKeyPolicy, PrefixedSecretKeyPolicy, SecretKeyPolicy};
pub use provider::{LoadReport, PathLoadOutcome, PathStatus, VaultConfigurationProvider};
pub use registration::VaultConfigurationExt;
pub use source::VaultConfigurationSource;
