//! 控制台示例：文件 + 环境变量 + Vault
//!
//! ```bash
//! export APP_VAULT__URL=http://127.0.0.1:8200
//! export APP_VAULT__ROLE_ID=...
//! export APP_VAULT__SECRET_ID=...
//! export LOG_FORMAT=json   # optional
//! cargo run -p vconf-config --example console
//! ```

use std::env;

use vconf_config::{ConfigurationBuilder, VaultConfigurationExt, VaultConfigurationOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // LOG_FORMAT=json 输出结构化日志
    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => vconf_telemetry::init_tracing_json("info"),
        _ => vconf_telemetry::init_tracing("info"),
    }

    let config_dir = env::var("APP_CONFIG_DIR").unwrap_or_else(|_| "crates/config/config".into());
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

    // 先只加载文件和环境变量，从中读取 Vault 连接配置
    let mut builder = ConfigurationBuilder::new();
    builder
        .add_toml_file(format!("{}/default.toml", config_dir))
        .add_toml_file(format!("{}/{}.toml", config_dir, app_env))
        .add_env("APP_");
    let bootstrap = builder.build().await?;

    let options = VaultConfigurationOptions::from_configuration(&bootstrap, "Vault")?;
    builder.add_vault_from_options(options.as_ref())?;
    let config = builder.build().await?;

    println!("Loaded {} source(s)", config.providers().len());
    for provider in config.providers() {
        let snapshot = provider.snapshot();
        println!("[{}] {} key(s)", provider.name(), snapshot.len());
        for key in snapshot.keys() {
            println!("  {}", key);
        }
    }

    match config.get("Secret1") {
        Some(_) => println!("Secret1 is set"),
        None => println!("Secret1 is not set"),
    }

    Ok(())
}
