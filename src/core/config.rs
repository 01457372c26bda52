use crate::core::deadline::{DeadlinePolicy, StageBudgets};
use crate::providers::awesome_api::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub database_path: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:8080".to_string(),
            database_path: "cotacoes.db".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BudgetsConfig {
    pub fetch_ms: u64,
    pub persist_ms: u64,
    pub policy: DeadlinePolicy,
}

impl Default for BudgetsConfig {
    fn default() -> Self {
        let budgets = StageBudgets::default();
        BudgetsConfig {
            fetch_ms: budgets.fetch.as_millis() as u64,
            persist_ms: budgets.persist.as_millis() as u64,
            policy: budgets.policy,
        }
    }
}

impl BudgetsConfig {
    pub fn stage_budgets(&self) -> StageBudgets {
        StageBudgets {
            fetch: Duration::from_millis(self.fetch_ms),
            persist: Duration::from_millis(self.persist_ms),
            policy: self.policy,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout_ms: u64,
    pub output_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "http://localhost:8080/cotacao".to_string(),
            timeout_ms: 300,
            output_path: "cotacao.txt".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub budgets: BudgetsConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Loads the config file from the default location, falling back to
    /// built-in defaults when none exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("br", "cotacao", "cotacao")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
