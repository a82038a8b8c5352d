//! Basic usage example for vconf-adapter-vault
//!
//! Run with:
//! ```bash
//! export VAULT_ADDR=http://127.0.0.1:8200
//! export VAULT_ROLE_ID=your-role-id
//! export VAULT_SECRET_ID=your-secret-id
//! cargo run --example basic_usage -- secret myapp/config
//! ```

use vconf_adapter_vault::{SecretStore, VaultAuthMethod, VaultClient, VaultConfigBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let mount_point = args.next().unwrap_or_else(|| "secret".to_string());
    let path = args.next().unwrap_or_else(|| "myapp/config".to_string());

    let config = VaultConfigBuilder::new(
        std::env::var("VAULT_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8200".to_string()),
    )
    .with_request_timeout(10)
    .build();
    println!("Vault endpoint: {}", config.endpoint);

    let auth = VaultAuthMethod::app_role(
        std::env::var("VAULT_ROLE_ID")?,
        std::env::var("VAULT_SECRET_ID")?,
    );
    let client = VaultClient::new(config, auth)?;

    let secret = client.read_secret(&mount_point, &path).await?;
    println!(
        "Read {}/{} (version {:?})",
        mount_point, path, secret.metadata.version
    );
    for key in secret.data.keys() {
        println!("  {}", key);
    }

    Ok(())
}
