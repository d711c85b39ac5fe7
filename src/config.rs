use std::{fs, path::Path, path::PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::utils;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_LOG_FILTER: &str = "info,fyyur=debug";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Database file; defaults to `fyyur.sqlite` in the data root.
    pub database: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            seed_demo_data: true,
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from the data root, then applies `FYYUR_*`
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = read_config(&utils::config_path())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(utils::database_path)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database) = lookup("FYYUR_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(host) = lookup("FYYUR_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("FYYUR_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("FYYUR_PORT is not a port number: {port}"))?;
        }
        if let Some(filter) = lookup("FYYUR_LOG") {
            self.log_filter = filter;
        }
        if let Some(seed) = lookup("FYYUR_SEED") {
            self.seed_demo_data = matches!(seed.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))
}
