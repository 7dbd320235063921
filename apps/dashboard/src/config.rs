use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File};
use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "dashboard.toml";
pub const ENV_PREFIX: &str = "APP";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `http(s)://` URL or local path of the hospital table.
    pub source: String,
    pub search_debounce_ms: u64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: "http://127.0.0.1:8080/hospitals.csv".into(),
            search_debounce_ms: 200,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            card_width: 320.0,
            card_height: 220.0,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.trim().is_empty() {
            bail!("source must not be empty");
        }
        if self.source.contains("://") {
            Url::parse(&self.source)
                .with_context(|| format!("invalid source url `{}`", self.source))?;
        }
        for (name, value) in [
            ("viewport_width", self.viewport_width),
            ("viewport_height", self.viewport_height),
            ("card_width", self.card_width),
            ("card_height", self.card_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive number, got {value}");
            }
        }
        Ok(())
    }
}

/// Config files consulted when no explicit path is given, lowest priority
/// first: the platform config dir, then the working directory.
pub fn default_config_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("hospital-dashboard").join(CONFIG_FILE_NAME));
    }
    files.push(PathBuf::from(CONFIG_FILE_NAME));
    files
}

pub fn app_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

/// Defaults, then config files, then `APP__*` variables.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    let files = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            vec![path.to_path_buf()]
        }
        None => default_config_files(),
    };
    build_settings(&files, app_environment())
}

pub fn build_settings(files: &[PathBuf], env: Environment) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();
    for file in files {
        builder = builder.add_source(File::from(file.as_path()).required(false));
    }
    let settings: Settings = builder
        .add_source(env)
        .build()
        .context("failed to read dashboard configuration")?
        .try_deserialize()
        .context("failed to decode dashboard configuration")?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
