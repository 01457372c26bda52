pub mod client;
pub mod core;
pub mod providers;
pub mod server;
pub mod setup;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::deadline::DeadlinePolicy;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Server {
        deadline_policy: Option<DeadlinePolicy>,
    },
    Client,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let mut config = load_config(config_path)?;

    match command {
        AppCommand::Server { deadline_policy } => {
            if let Some(policy) = deadline_policy {
                config.budgets.policy = policy;
            }
            info!("Quote server starting...");
            server::run_server(&config).await
        }
        AppCommand::Client => {
            client::run_client(&config.client).await?;
            Ok(())
        }
    }
}
