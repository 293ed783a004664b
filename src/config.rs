use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default upload ceiling: 32 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricepipeConfig {
    pub database: String,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
    pub request_timeout_secs: u64,
}

impl Default for PricepipeConfig {
    fn default() -> Self {
        Self {
            database: default_database_path().to_string_lossy().into_owned(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PricepipeConfig {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply environment overrides. Unparsable numbers keep the current value.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(db) = get("PRICEPIPE_DATABASE") {
            self.database = db;
        }
        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(max) = get("PRICEPIPE_MAX_UPLOAD_BYTES").and_then(|v| v.trim().parse().ok()) {
            self.max_upload_bytes = max;
        }
        if let Some(secs) = get("PRICEPIPE_REQUEST_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("pricepipe.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".pricepipe").join("prices.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<PricepipeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: PricepipeConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Config file (or defaults) with environment overrides applied.
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<PricepipeConfig> {
    let mut config = load_config(path)?.unwrap_or_default();
    config.apply_env();
    Ok(config)
}

pub fn write_config(path: &Path, config: &PricepipeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: PricepipeConfig = toml::from_str("port = 9000\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PRICEPIPE_DATABASE", "/tmp/p.db"),
            ("PORT", "not-a-port"),
            ("PRICEPIPE_MAX_UPLOAD_BYTES", "1024"),
        ]
        .into_iter()
        .collect();

        let mut config = PricepipeConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.database, "/tmp/p.db");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pricepipe.toml");
        let config = PricepipeConfig {
            port: 9191,
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
        assert_eq!(load_config(Some(&dir.path().join("missing.toml"))).unwrap(), None);
    }
}
