use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::playout::BuildOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub lookahead_hours: i64,
    pub rebuild_interval_minutes: u64,
    pub timezone: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            fs::write(path, Self::default_template())?;
            tracing::info!("Wrote default configuration to {}", path);
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn zone(&self) -> chrono_tz::Tz {
        self.scheduling
            .timezone
            .parse()
            .unwrap_or(chrono_tz::UTC)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            lookahead_hours: self.scheduling.lookahead_hours,
            zone: self.zone(),
        }
    }

    pub fn default_template() -> &'static str {
        r#"[server]
host = "0.0.0.0"
port = 8411

[database]
# Path to the SQLite database. Ensure the directory exists.
url = "pseudovision.db"

[logging]
level = "info"

[scheduling]
# How far ahead playout timelines are compiled.
lookahead_hours = 72
# How often stale playouts are rebuilt in the background.
rebuild_interval_minutes = 60
# IANA zone used to interpret fixed slot start times.
timezone = "UTC"
"#
    }
}
